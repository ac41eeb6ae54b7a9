// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Crash-guarded execution.
//!
//! [`CrashGuard::run`] arms the interceptor, times one execution of a
//! probe, disarms, and reports whether the probe faulted. The interceptor
//! is disarmed on every exit path, including a panic escaping the probe,
//! before control returns to the caller.

mod result;

pub use result::RunResult;

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use log::{debug, error};
use thiserror::Error;

use crate::interceptor::{FaultInterceptor, InterceptorError, PlatformInterceptor};
use crate::probe::{FaultProbe, ProbeError};

/// Fatal errors of a guarded run. A run that returns one of these produced
/// no [`RunResult`].
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("probe setup failed: {0}")]
    Setup(#[source] ProbeError),
    #[error("fault interception failed: {0}")]
    Interceptor(#[source] InterceptorError),
}

impl From<InterceptorError> for GuardError {
    fn from(err: InterceptorError) -> Self {
        match err {
            InterceptorError::Probe(inner) => GuardError::Setup(inner),
            other => GuardError::Interceptor(other),
        }
    }
}

/// Disarms on drop unless [`Armed::finish`] already did.
struct Armed<'a, I: FaultInterceptor> {
    interceptor: &'a mut I,
    finished: bool,
}

impl<'a, I: FaultInterceptor> Armed<'a, I> {
    fn new(interceptor: &'a mut I) -> Self {
        Self {
            interceptor,
            finished: false,
        }
    }

    fn finish(mut self) -> Result<(), InterceptorError> {
        self.finished = true;
        self.interceptor.disarm()
    }
}

impl<I: FaultInterceptor> Deref for Armed<'_, I> {
    type Target = I;

    fn deref(&self) -> &I {
        self.interceptor
    }
}

impl<I: FaultInterceptor> DerefMut for Armed<'_, I> {
    fn deref_mut(&mut self) -> &mut I {
        self.interceptor
    }
}

impl<I: FaultInterceptor> Drop for Armed<'_, I> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.interceptor.disarm() {
            error!("disarming {} interceptor failed: {}", self.interceptor.name(), err);
        }
    }
}

/// Runs probes one at a time under a fault interceptor.
pub struct CrashGuard<I: FaultInterceptor = PlatformInterceptor> {
    interceptor: I,
    runs: u64,
}

impl CrashGuard<PlatformInterceptor> {
    /// Guard using the backend compiled in for this platform.
    pub fn new() -> Self {
        Self::with_interceptor(PlatformInterceptor::new())
    }
}

impl Default for CrashGuard<PlatformInterceptor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: FaultInterceptor> CrashGuard<I> {
    pub fn with_interceptor(interceptor: I) -> Self {
        Self {
            interceptor,
            runs: 0,
        }
    }

    pub fn interceptor(&self) -> &I {
        &self.interceptor
    }

    /// Completed guarded runs so far.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Execute `probe` once under interception.
    ///
    /// Not re-entrant: fault handling is process-wide, and a second guard
    /// trying to run while this one is armed fails with
    /// [`InterceptorError::AlreadyArmed`].
    pub fn run<P: FaultProbe + ?Sized>(&mut self, probe: &mut P) -> Result<RunResult, GuardError> {
        let kind = probe.kind();
        let mut armed = Armed::new(&mut self.interceptor);
        let token = armed.arm()?;

        let start = Instant::now();
        let outcome = armed.run_protected(token, &mut || probe.execute());
        let elapsed = start.elapsed();

        armed.finish()?;
        let outcome = outcome?;

        self.runs += 1;
        let result = RunResult::new(outcome.faulted(), elapsed);
        debug!(
            "{} probe finished: crashed={} elapsed_ns={}",
            kind, result.crashed, result.elapsed_ns
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::{ArmToken, Outcome, ProtectedOp};
    use crate::probe::ProbeKind;

    /// Interceptor double that reports a fault without running anything.
    #[derive(Default)]
    struct Scripted {
        armed: bool,
        fault: bool,
        arms: usize,
        disarms: usize,
        fail_disarm: bool,
    }

    impl FaultInterceptor for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
            self.armed = true;
            self.arms += 1;
            Ok(ArmToken::new())
        }

        fn run_protected(
            &mut self,
            _token: ArmToken,
            operation: ProtectedOp<'_>,
        ) -> Result<Outcome, InterceptorError> {
            if self.fault {
                return Ok(Outcome::Faulted);
            }
            operation()?;
            Ok(Outcome::Completed)
        }

        fn disarm(&mut self) -> Result<(), InterceptorError> {
            if self.armed {
                self.disarms += 1;
            }
            self.armed = false;
            if self.fail_disarm {
                return Err(InterceptorError::Restore {
                    what: "scripted handler",
                    source: std::io::Error::from(std::io::ErrorKind::Other),
                });
            }
            Ok(())
        }

        fn is_armed(&self) -> bool {
            self.armed
        }
    }

    struct Counting {
        calls: usize,
        fail: bool,
        panic: bool,
    }

    impl FaultProbe for Counting {
        fn kind(&self) -> ProbeKind {
            ProbeKind::Heap
        }

        fn execute(&mut self) -> Result<(), ProbeError> {
            self.calls += 1;
            if self.panic {
                panic!("probe blew up");
            }
            if self.fail {
                return Err(ProbeError::EmptyAllocation);
            }
            Ok(())
        }
    }

    fn counting() -> Counting {
        Counting {
            calls: 0,
            fail: false,
            panic: false,
        }
    }

    #[test]
    fn completed_run_is_not_crashed() {
        let mut guard = CrashGuard::with_interceptor(Scripted::default());
        let mut probe = counting();
        let r = guard.run(&mut probe).unwrap();
        assert!(!r.crashed);
        assert_eq!(probe.calls, 1);
        assert_eq!(guard.interceptor().arms, 1);
        assert_eq!(guard.interceptor().disarms, 1);
        assert!(!guard.interceptor().is_armed());
        assert_eq!(guard.runs(), 1);
    }

    #[test]
    fn faulted_outcome_sets_crashed() {
        let mut guard = CrashGuard::with_interceptor(Scripted {
            fault: true,
            ..Scripted::default()
        });
        let r = guard.run(&mut counting()).unwrap();
        assert!(r.crashed);
        assert!(!guard.interceptor().is_armed());
    }

    #[test]
    fn setup_error_is_not_a_result() {
        let mut guard = CrashGuard::with_interceptor(Scripted::default());
        let mut probe = Counting {
            fail: true,
            ..counting()
        };
        let err = guard.run(&mut probe).unwrap_err();
        assert!(matches!(err, GuardError::Setup(ProbeError::EmptyAllocation)));
        assert_eq!(guard.interceptor().disarms, 1);
        assert_eq!(guard.runs(), 0);
    }

    #[test]
    fn disarm_failure_is_fatal() {
        let mut guard = CrashGuard::with_interceptor(Scripted {
            fail_disarm: true,
            ..Scripted::default()
        });
        let err = guard.run(&mut counting()).unwrap_err();
        assert!(matches!(err, GuardError::Interceptor(InterceptorError::Restore { .. })));
    }

    #[test]
    fn panicking_probe_still_disarms() {
        let mut guard = CrashGuard::with_interceptor(Scripted::default());
        let mut probe = Counting {
            panic: true,
            ..counting()
        };
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = guard.run(&mut probe);
        }));
        assert!(caught.is_err());
        assert!(!guard.interceptor().is_armed());
        assert_eq!(guard.interceptor().disarms, 1);
    }
}
