// CLASSIFICATION: COMMUNITY
// Filename: checkpoint.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Signal/checkpoint backend.
//!
//! `run_protected` saves a `sigsetjmp` checkpoint and publishes it to the
//! SIGSEGV/SIGBUS handler. The handler does nothing but `siglongjmp` back
//! to that checkpoint: no allocation, no I/O, no inspection of the memory
//! that faulted. `sigsetjmp(env, 1)` records the signal mask, so the jump
//! also unblocks the signal that was being delivered.
//!
//! A fault that arrives while no checkpoint is published is outside the
//! guarded window. The handler then reinstates the default disposition and
//! returns, the faulting instruction re-executes, and the process dies the
//! way it would have without this crate.

use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use libc::{c_int, c_void};
use log::{debug, error};

use super::{
    ArmToken, FaultInterceptor, InterceptorError, InterceptorState, Outcome, ProtectedOp,
};
use crate::probe::ProbeError;

/// Signals raised for invalid memory accesses. macOS reports guard-page
/// writes as SIGBUS.
const FAULT_SIGNALS: [c_int; 2] = [libc::SIGSEGV, libc::SIGBUS];

/// Opaque `sigjmp_buf` storage, sized above every supported libc
/// (glibc 200 bytes, musl and Darwin smaller).
#[repr(C, align(16))]
struct SigJmpBuf {
    _buf: [u8; 512],
}

extern "C" {
    // glibc only exports sigsetjmp as the __sigsetjmp macro target.
    #[cfg_attr(all(target_os = "linux", target_env = "gnu"), link_name = "__sigsetjmp")]
    fn sigsetjmp(env: *mut SigJmpBuf, savemask: c_int) -> c_int;
    fn siglongjmp(env: *mut SigJmpBuf, val: c_int) -> !;
}

/// Checkpoint the handler jumps to. Null outside the guarded window.
static CHECKPOINT: AtomicPtr<SigJmpBuf> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_fault(sig: c_int, _info: *mut libc::siginfo_t, _uctx: *mut c_void) {
    let env = CHECKPOINT.swap(ptr::null_mut(), Ordering::AcqRel);
    if env.is_null() {
        // SAFETY: signal() is async-signal-safe.
        unsafe { libc::signal(sig, libc::SIG_DFL) };
        return;
    }
    // SAFETY: env was published by checkpoint_and_call after its sigsetjmp
    // returned 0, and that frame is live until it clears CHECKPOINT.
    unsafe { siglongjmp(env, 1) }
}

/// Save a checkpoint, then run `op`. Returns `true` when control came back
/// through the fault handler.
///
/// Kept out of line and free of locals that outlive the `sigsetjmp` call so
/// that nothing here depends on state a `siglongjmp` could leave stale.
#[inline(never)]
unsafe fn checkpoint_and_call(
    env: *mut SigJmpBuf,
    op: ProtectedOp<'_>,
    out: &mut Option<Result<(), ProbeError>>,
) -> bool {
    // SAFETY: env points to a live SigJmpBuf owned by the interceptor.
    if unsafe { sigsetjmp(env, 1) } != 0 {
        return true;
    }
    CHECKPOINT.store(env, Ordering::Release);
    let result = op();
    CHECKPOINT.store(ptr::null_mut(), Ordering::Release);
    *out = Some(result);
    false
}

/// In-process recovery through `sigsetjmp`/`siglongjmp`.
pub struct CheckpointInterceptor {
    state: Option<InterceptorState>,
    previous: Vec<(c_int, libc::sigaction)>,
    env: Box<SigJmpBuf>,
}

impl Default for CheckpointInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointInterceptor {
    pub fn new() -> Self {
        Self {
            state: None,
            previous: Vec::with_capacity(FAULT_SIGNALS.len()),
            env: Box::new(SigJmpBuf { _buf: [0u8; 512] }),
        }
    }

    fn install(&mut self, signals: &[c_int]) -> Result<(), InterceptorError> {
        for &sig in signals {
            // SAFETY: sa is zero-initialised, then every field sigaction
            // reads is set; old is a valid out-pointer.
            let old = unsafe {
                let mut sa: libc::sigaction = mem::zeroed();
                sa.sa_sigaction = on_fault
                    as extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void)
                    as libc::sighandler_t;
                sa.sa_flags = libc::SA_SIGINFO;
                libc::sigemptyset(&mut sa.sa_mask);
                let mut old: libc::sigaction = mem::zeroed();
                if libc::sigaction(sig, &sa, &mut old) != 0 {
                    return Err(InterceptorError::Install {
                        what: signal_name(sig),
                        source: io::Error::last_os_error(),
                    });
                }
                old
            };
            self.previous.push((sig, old));
        }
        Ok(())
    }

    fn restore(&mut self) -> Result<(), InterceptorError> {
        let mut first_err = None;
        while let Some((sig, old)) = self.previous.pop() {
            // SAFETY: old was filled in by the matching sigaction call.
            let ret = unsafe { libc::sigaction(sig, &old, ptr::null_mut()) };
            if ret != 0 && first_err.is_none() {
                first_err = Some(InterceptorError::Restore {
                    what: signal_name(sig),
                    source: io::Error::last_os_error(),
                });
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl CheckpointInterceptor {
    fn arm_for(&mut self, signals: &[c_int]) -> Result<ArmToken, InterceptorError> {
        if self.state.is_some() {
            return Err(InterceptorError::AlreadyArmed);
        }
        let state = InterceptorState::claim()?;
        if let Err(err) = self.install(signals) {
            if let Err(restore_err) = self.restore() {
                error!(
                    "rolling back partially installed fault handlers failed: {}",
                    restore_err
                );
            }
            drop(state);
            return Err(err);
        }
        self.state = Some(state);
        debug!("checkpoint interceptor armed for SIGSEGV/SIGBUS");
        Ok(ArmToken::new())
    }
}

impl FaultInterceptor for CheckpointInterceptor {
    fn name(&self) -> &'static str {
        "checkpoint"
    }

    fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
        self.arm_for(&FAULT_SIGNALS)
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
        let env: *mut SigJmpBuf = &mut *self.env;
        let mut result = None;
        // SAFETY: env lives in self for the whole call and is published only
        // while checkpoint_and_call's frame is live.
        let faulted = unsafe { checkpoint_and_call(env, operation, &mut result) };
        if faulted {
            return Ok(Outcome::Faulted);
        }
        match result {
            Some(Err(err)) => Err(err.into()),
            _ => Ok(Outcome::Completed),
        }
    }

    fn disarm(&mut self) -> Result<(), InterceptorError> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };
        CHECKPOINT.store(ptr::null_mut(), Ordering::Release);
        let restored = self.restore();
        // Release the claim only once the old handlers are back.
        drop(state);
        debug!("checkpoint interceptor disarmed");
        restored
    }

    fn is_armed(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for CheckpointInterceptor {
    fn drop(&mut self) {
        let _ = self.disarm();
    }
}

fn signal_name(sig: c_int) -> &'static str {
    match sig {
        libc::SIGSEGV => "SIGSEGV handler",
        libc::SIGBUS => "SIGBUS handler",
        _ => "signal handler",
    }
}
