// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Fault probes.
//!
//! A probe wraps one fault-inducing operation together with its
//! parameters. The only capability it exposes is "execute; may fault":
//! callers never learn how the fault is produced, and the probes never
//! learn how it is intercepted.

pub mod heap;
pub mod kernel;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mem::MemError;

pub use heap::HeapOverflowProbe;
pub use kernel::KernelAccessProbe;

/// Which fault a probe provokes. The `Display` form is the label used in
/// reports (`Heap`, `Kernel`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProbeKind {
    Heap,
    Kernel,
}

impl ProbeKind {
    pub fn label(self) -> &'static str {
        match self {
            ProbeKind::Heap => "Heap",
            ProbeKind::Kernel => "Kernel",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProbeKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heap" => Ok(ProbeKind::Heap),
            "kernel" => Ok(ProbeKind::Kernel),
            other => Err(ProbeError::UnknownKind(other.to_string())),
        }
    }
}

/// Setup failures inside a probe. These are tooling errors, never outcomes.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Mem(#[from] MemError),
    #[error("allocation size must be at least one byte")]
    EmptyAllocation,
    #[error("address {0:#x} does not fit this target's pointer width")]
    AddressOutOfRange(u64),
    #[error("address {0:#x} cannot be written as a 32-bit word on this target")]
    UnwritableAddress(u64),
    #[error("cannot keep a {0}-byte copy of the allocation")]
    SnapshotTooLarge(usize),
    #[error("unknown probe kind {0:?}")]
    UnknownKind(String),
}

/// A single fault-inducing operation.
pub trait FaultProbe {
    /// Label used when reporting this probe's results.
    fn kind(&self) -> ProbeKind;

    /// Run the operation once.
    ///
    /// May raise a hardware memory fault instead of returning; in that case
    /// nothing after the faulting instruction runs and any resources the
    /// call acquired are abandoned. Implementations must therefore keep no
    /// values with destructors live across the faulting write.
    fn execute(&mut self) -> Result<(), ProbeError>;
}

impl<P: FaultProbe + ?Sized> FaultProbe for Box<P> {
    fn kind(&self) -> ProbeKind {
        (**self).kind()
    }

    fn execute(&mut self) -> Result<(), ProbeError> {
        (**self).execute()
    }
}
