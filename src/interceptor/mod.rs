// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Fault interception backends.
//!
//! Every backend implements the same three-step contract:
//!
//! 1. [`FaultInterceptor::arm`] installs interception and hands back an
//!    [`ArmToken`] meaning "no fault has happened yet".
//! 2. [`FaultInterceptor::run_protected`] consumes the token, runs the
//!    operation once and reports [`Outcome::Faulted`] if a memory fault
//!    cut it short. Control comes back to the caller of `run_protected`,
//!    never to the faulting instruction.
//! 3. [`FaultInterceptor::disarm`] restores the previous fault handling.
//!    It is a no-op when nothing is armed.
//!
//! Exactly one backend is compiled in and exported as
//! [`PlatformInterceptor`]. Callers should depend on the trait only.

pub mod state;

#[cfg(all(unix, not(feature = "isolate")))]
mod checkpoint;
#[cfg(all(unix, not(feature = "isolate")))]
pub use checkpoint::CheckpointInterceptor as PlatformInterceptor;

#[cfg(all(unix, feature = "isolate"))]
mod isolate;
#[cfg(all(unix, feature = "isolate"))]
pub use isolate::IsolateInterceptor as PlatformInterceptor;

#[cfg(all(windows, target_arch = "x86_64"))]
mod seh;
#[cfg(all(windows, target_arch = "x86_64"))]
pub use seh::SehInterceptor as PlatformInterceptor;

#[cfg(not(any(unix, all(windows, target_arch = "x86_64"))))]
compile_error!("memcrash has no fault interception backend for this target");

use std::io;

use thiserror::Error;

use crate::probe::ProbeError;

pub use state::InterceptorState;

/// How a protected operation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Faulted,
}

impl Outcome {
    pub fn faulted(self) -> bool {
        self == Outcome::Faulted
    }
}

/// Issued by `arm`, spent by `run_protected`: one protected run per arm.
#[must_use = "an armed interceptor must be used by run_protected"]
#[derive(Debug)]
pub struct ArmToken {
    _private: (),
}

impl ArmToken {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// The operation handed to `run_protected`.
pub type ProtectedOp<'a> = &'a mut dyn FnMut() -> Result<(), ProbeError>;

/// Setup and teardown failures. None of these is a probe outcome.
#[derive(Debug, Error)]
pub enum InterceptorError {
    #[error("a fault interceptor is already armed in this process")]
    AlreadyArmed,
    #[error("run_protected called on a disarmed interceptor")]
    NotArmed,
    #[error("installing {what} failed: {source}")]
    Install {
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("restoring {what} failed: {source}")]
    Restore {
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("spawning isolated probe failed: {0}")]
    Spawn(#[source] io::Error),
    #[error("waiting for isolated probe failed: {0}")]
    Wait(#[source] io::Error),
    #[error("isolated probe failed during setup")]
    ChildSetupFailed,
    #[error("isolated probe panicked")]
    ChildPanicked,
    #[error("isolated probe ended unexpectedly: {0}")]
    UnexpectedChildStatus(String),
}

/// Converts a hardware memory fault into a resumable control-flow event.
pub trait FaultInterceptor {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Install interception. Fails with [`InterceptorError::AlreadyArmed`]
    /// if any interceptor in the process is currently armed.
    fn arm(&mut self) -> Result<ArmToken, InterceptorError>;

    /// Run `operation` once under interception.
    fn run_protected(
        &mut self,
        token: ArmToken,
        operation: ProtectedOp<'_>,
    ) -> Result<Outcome, InterceptorError>;

    /// Restore the fault handling that was in place before `arm`.
    fn disarm(&mut self) -> Result<(), InterceptorError>;

    fn is_armed(&self) -> bool;
}

impl<I: FaultInterceptor + ?Sized> FaultInterceptor for Box<I> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
        (**self).arm()
    }

    fn run_protected(
        &mut self,
        token: ArmToken,
        operation: ProtectedOp<'_>,
    ) -> Result<Outcome, InterceptorError> {
        (**self).run_protected(token, operation)
    }

    fn disarm(&mut self) -> Result<(), InterceptorError> {
        (**self).disarm()
    }

    fn is_armed(&self) -> bool {
        (**self).is_armed()
    }
}
