// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v1.1
// Date Modified: 2026-10-16
// Author: Lukas Bower

//! Root library for the memcrash fault-injection harness.
//!
//! A [`guard::CrashGuard`] runs one [`probe::FaultProbe`] under the
//! platform's [`interceptor::FaultInterceptor`], converting a hardware
//! memory fault into a [`guard::RunResult`] instead of process death.

/// Page-granular memory with trailing guard pages
pub mod mem;

/// Fault-inducing operations
pub mod probe;

/// Platform fault interception backends
pub mod interceptor;

/// Guarded execution and run results
pub mod guard;

/// Sequential trial loop
pub mod trial;

/// Harness configuration resolved from the command line
pub mod config;

/// CSV persistence and summary rendering
pub mod report;

/// Command-line definitions for the harness binaries
pub mod cli;

/// Library wrappers for the harness binaries.
pub mod binlib;

pub use guard::{CrashGuard, GuardError, RunResult};
pub use probe::{FaultProbe, ProbeKind};

use thiserror::Error;

/// Top-level error for a whole harness invocation.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Guard(#[from] guard::GuardError),
    #[error(transparent)]
    Report(#[from] report::ReportError),
}
