// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Library wrappers for the memcrash binaries.

pub mod memcrash_main;
pub mod summary_main;
