// CLASSIFICATION: COMMUNITY
// Filename: isolate.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Process-isolation backend.
//!
//! Nothing is recovered in-process: `run_protected` forks, the child runs
//! the operation with default fault dispositions and no core dumps, and the
//! parent classifies the child's termination. Death by SIGSEGV or SIGBUS is
//! a fault; a clean exit is a completed run. Side effects the operation has
//! on its own state stay in the child.

use std::io;
use std::panic::{self, AssertUnwindSafe};

use libc::c_int;
use log::debug;

use super::{
    ArmToken, FaultInterceptor, InterceptorError, InterceptorState, Outcome, ProtectedOp,
};

/// Child exit status for a probe setup error.
const EXIT_SETUP_FAILED: c_int = 86;
/// Child exit status for a panic inside the operation.
const EXIT_PANICKED: c_int = 87;

/// Runs every protected operation in a forked child.
#[derive(Default)]
pub struct IsolateInterceptor {
    state: Option<InterceptorState>,
}

impl IsolateInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Child side of the fork. Never returns.
fn run_child(operation: ProtectedOp<'_>) -> ! {
    // SAFETY: plain libc calls on the child's own process state.
    unsafe {
        libc::signal(libc::SIGSEGV, libc::SIG_DFL);
        libc::signal(libc::SIGBUS, libc::SIG_DFL);
        let no_core = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        libc::setrlimit(libc::RLIMIT_CORE, &no_core);
    }
    let code = match panic::catch_unwind(AssertUnwindSafe(|| operation())) {
        Ok(Ok(())) => 0,
        Ok(Err(_)) => EXIT_SETUP_FAILED,
        Err(_) => EXIT_PANICKED,
    };
    // SAFETY: _exit skips atexit handlers and stdio flushing that belong
    // to the parent.
    unsafe { libc::_exit(code) }
}

fn wait_for(pid: libc::pid_t) -> Result<c_int, InterceptorError> {
    let mut status: c_int = 0;
    loop {
        // SAFETY: status is a valid out-pointer; pid is our child.
        let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
        if ret == pid {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(InterceptorError::Wait(err));
        }
    }
}

fn classify(status: c_int) -> Result<Outcome, InterceptorError> {
    if libc::WIFSIGNALED(status) {
        let sig = libc::WTERMSIG(status);
        if sig == libc::SIGSEGV || sig == libc::SIGBUS {
            return Ok(Outcome::Faulted);
        }
        return Err(InterceptorError::UnexpectedChildStatus(format!(
            "killed by signal {sig}"
        )));
    }
    if libc::WIFEXITED(status) {
        return match libc::WEXITSTATUS(status) {
            0 => Ok(Outcome::Completed),
            EXIT_SETUP_FAILED => Err(InterceptorError::ChildSetupFailed),
            EXIT_PANICKED => Err(InterceptorError::ChildPanicked),
            code => Err(InterceptorError::UnexpectedChildStatus(format!(
                "exited with status {code}"
            ))),
        };
    }
    Err(InterceptorError::UnexpectedChildStatus(format!(
        "raw wait status {status:#x}"
    )))
}

impl FaultInterceptor for IsolateInterceptor {
    fn name(&self) -> &'static str {
        "isolate"
    }

    fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
        if self.state.is_some() {
            return Err(InterceptorError::AlreadyArmed);
        }
        self.state = Some(InterceptorState::claim()?);
        debug!("isolate interceptor armed");
        Ok(ArmToken::new())
    }

    fn run_protected(
        &mut self,
        token: ArmToken,
        operation: ProtectedOp<'_>,
    ) -> Result<Outcome, InterceptorError> {
        if self.state.is_none() {
            return Err(InterceptorError::NotArmed);
        }
        let _ = token;
        // SAFETY: the child only runs the operation and then _exits.
        let pid = unsafe { libc::fork() };
        match pid {
            -1 => Err(InterceptorError::Spawn(io::Error::last_os_error())),
            0 => run_child(operation),
            child => classify(wait_for(child)?),
        }
    }

    fn disarm(&mut self) -> Result<(), InterceptorError> {
        if self.state.take().is_some() {
            debug!("isolate interceptor disarmed");
        }
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use serial_test::serial;

    #[test]
    #[serial]
    fn clean_child_is_completed() {
        let mut interceptor = IsolateInterceptor::new();
        let token = interceptor.arm().unwrap();
        let outcome = interceptor.run_protected(token, &mut || Ok(())).unwrap();
        interceptor.disarm().unwrap();
        assert_eq!(outcome, Outcome::Completed);
    }

    #[test]
    #[serial]
    fn child_setup_error_is_reported() {
        let mut interceptor = IsolateInterceptor::new();
        let token = interceptor.arm().unwrap();
        let res = interceptor.run_protected(token, &mut || Err(ProbeError::EmptyAllocation));
        interceptor.disarm().unwrap();
        assert!(matches!(res, Err(InterceptorError::ChildSetupFailed)));
    }
}
