// CLASSIFICATION: COMMUNITY
// Filename: state.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use super::InterceptorError;

static ARMED: AtomicBool = AtomicBool::new(false);

/// Claim on the process-wide interception slot.
///
/// At most one value exists at a time; a second [`InterceptorState::claim`]
/// fails until the first is dropped. Fault handlers are process-wide, so the
/// claim is also pinned to the thread that made it.
#[derive(Debug)]
pub struct InterceptorState {
    _thread_bound: PhantomData<*const ()>,
}

impl InterceptorState {
    pub fn claim() -> Result<Self, InterceptorError> {
        ARMED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InterceptorError::AlreadyArmed)?;
        Ok(Self {
            _thread_bound: PhantomData,
        })
    }

    /// Whether some interceptor currently holds the claim.
    pub fn is_claimed() -> bool {
        ARMED.load(Ordering::Acquire)
    }
}

impl Drop for InterceptorState {
    fn drop(&mut self) {
        ARMED.store(false, Ordering::Release);
    }
}
