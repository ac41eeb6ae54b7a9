// CLASSIFICATION: COMMUNITY
// Filename: seh.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Structured-exception backend (Windows x86-64).
//!
//! Rust has no `__try`/`__except`, so the protected region is expressed
//! with a first-chance vectored exception handler that is only live while
//! a checkpoint is published. On an access violation the handler does not
//! unwind anything: it rewrites the faulting thread's context so that it
//! resumes in `resume_checkpoint`, which reloads the callee-saved state
//! captured by `save_checkpoint` and returns 1 from it. Going through the
//! exception dispatcher's own context restore sidesteps the SEH unwind that
//! a plain `longjmp` out of a vectored handler would trigger.

use std::ffi::c_void;
use std::io;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use log::debug;

use super::{
    ArmToken, FaultInterceptor, InterceptorError, InterceptorState, Outcome, ProtectedOp,
};
use crate::probe::ProbeError;

const EXCEPTION_ACCESS_VIOLATION: u32 = 0xC000_0005;
const EXCEPTION_IN_PAGE_ERROR: u32 = 0xC000_0006;
const EXCEPTION_GUARD_PAGE: u32 = 0x8000_0001;
const EXCEPTION_CONTINUE_EXECUTION: i32 = -1;
const EXCEPTION_CONTINUE_SEARCH: i32 = 0;

#[allow(dead_code)]
#[repr(C)]
struct ExceptionRecord {
    exception_code: u32,
    exception_flags: u32,
    exception_record: *mut ExceptionRecord,
    exception_address: *mut c_void,
    number_parameters: u32,
    exception_information: [usize; 15],
}

#[repr(C)]
struct ExceptionPointers {
    exception_record: *mut ExceptionRecord,
    context_record: *mut c_void,
}

/// Leading fields of the x86-64 `CONTEXT` record, through `Rip` (0xF8).
#[allow(dead_code)]
#[repr(C)]
struct ContextPrefix {
    home: [u64; 6],
    context_flags: u32,
    mx_csr: u32,
    segments: [u16; 6],
    eflags: u32,
    debug: [u64; 6],
    rax: u64,
    rcx: u64,
    rdx: u64,
    rbx: u64,
    rsp: u64,
    rbp: u64,
    rsi: u64,
    rdi: u64,
    r8_r15: [u64; 8],
    rip: u64,
}

#[link(name = "kernel32")]
extern "system" {
    fn AddVectoredExceptionHandler(
        first: u32,
        handler: unsafe extern "system" fn(*mut ExceptionPointers) -> i32,
    ) -> *mut c_void;
    fn RemoveVectoredExceptionHandler(handle: *mut c_void) -> u32;
}

/// Callee-saved state of the Windows x64 ABI: rbx, rbp, rdi, rsi,
/// r12-r15, rsp and the return address, then xmm6-xmm15.
#[repr(C, align(16))]
struct Checkpoint {
    gprs: [u64; 10],
    xmm: [u128; 10],
}

/// Returns 0 when called, 1 when re-entered through `resume_checkpoint`.
#[unsafe(naked)]
unsafe extern "C" fn save_checkpoint(_env: *mut Checkpoint) -> i32 {
    std::arch::naked_asm!(
        "mov [rcx + 0x00], rbx",
        "mov [rcx + 0x08], rbp",
        "mov [rcx + 0x10], rdi",
        "mov [rcx + 0x18], rsi",
        "mov [rcx + 0x20], r12",
        "mov [rcx + 0x28], r13",
        "mov [rcx + 0x30], r14",
        "mov [rcx + 0x38], r15",
        "lea rax, [rsp + 8]",
        "mov [rcx + 0x40], rax",
        "mov rax, [rsp]",
        "mov [rcx + 0x48], rax",
        "movdqa [rcx + 0x50], xmm6",
        "movdqa [rcx + 0x60], xmm7",
        "movdqa [rcx + 0x70], xmm8",
        "movdqa [rcx + 0x80], xmm9",
        "movdqa [rcx + 0x90], xmm10",
        "movdqa [rcx + 0xA0], xmm11",
        "movdqa [rcx + 0xB0], xmm12",
        "movdqa [rcx + 0xC0], xmm13",
        "movdqa [rcx + 0xD0], xmm14",
        "movdqa [rcx + 0xE0], xmm15",
        "xor eax, eax",
        "ret",
    );
}

/// Entered from the exception dispatcher with `rcx` = checkpoint.
#[unsafe(naked)]
unsafe extern "C" fn resume_checkpoint() -> ! {
    std::arch::naked_asm!(
        "movdqa xmm6, [rcx + 0x50]",
        "movdqa xmm7, [rcx + 0x60]",
        "movdqa xmm8, [rcx + 0x70]",
        "movdqa xmm9, [rcx + 0x80]",
        "movdqa xmm10, [rcx + 0x90]",
        "movdqa xmm11, [rcx + 0xA0]",
        "movdqa xmm12, [rcx + 0xB0]",
        "movdqa xmm13, [rcx + 0xC0]",
        "movdqa xmm14, [rcx + 0xD0]",
        "movdqa xmm15, [rcx + 0xE0]",
        "mov rbx, [rcx + 0x00]",
        "mov rbp, [rcx + 0x08]",
        "mov rdi, [rcx + 0x10]",
        "mov rsi, [rcx + 0x18]",
        "mov r12, [rcx + 0x20]",
        "mov r13, [rcx + 0x28]",
        "mov r14, [rcx + 0x30]",
        "mov r15, [rcx + 0x38]",
        "mov rsp, [rcx + 0x40]",
        "mov eax, 1",
        "jmp qword ptr [rcx + 0x48]",
    );
}

/// Checkpoint the handler redirects to. Null outside the protected region.
static CHECKPOINT: AtomicPtr<Checkpoint> = AtomicPtr::new(ptr::null_mut());

unsafe extern "system" fn on_exception(info: *mut ExceptionPointers) -> i32 {
    if info.is_null() {
        return EXCEPTION_CONTINUE_SEARCH;
    }
    // SAFETY: the dispatcher passes valid exception and context records.
    let (record, context) = unsafe { (&*(*info).exception_record, (*info).context_record) };
    match record.exception_code {
        EXCEPTION_ACCESS_VIOLATION | EXCEPTION_IN_PAGE_ERROR | EXCEPTION_GUARD_PAGE => {}
        _ => return EXCEPTION_CONTINUE_SEARCH,
    }
    let env = CHECKPOINT.swap(ptr::null_mut(), Ordering::AcqRel);
    if env.is_null() {
        return EXCEPTION_CONTINUE_SEARCH;
    }
    // SAFETY: context is the full CONTEXT of the faulting thread; only the
    // prefix fields are touched.
    unsafe {
        let ctx = &mut *context.cast::<ContextPrefix>();
        ctx.rcx = env as u64;
        ctx.rip = resume_checkpoint as usize as u64;
    }
    EXCEPTION_CONTINUE_EXECUTION
}

#[inline(never)]
unsafe fn checkpoint_and_call(
    env: *mut Checkpoint,
    op: ProtectedOp<'_>,
    out: &mut Option<Result<(), ProbeError>>,
) -> bool {
    // SAFETY: env points to a live, 16-byte aligned Checkpoint.
    if unsafe { save_checkpoint(env) } != 0 {
        return true;
    }
    CHECKPOINT.store(env, Ordering::Release);
    let result = op();
    CHECKPOINT.store(ptr::null_mut(), Ordering::Release);
    *out = Some(result);
    false
}

/// Access-violation capture through a scoped vectored exception handler.
pub struct SehInterceptor {
    state: Option<InterceptorState>,
    handler: *mut c_void,
    env: Box<Checkpoint>,
}

impl Default for SehInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl SehInterceptor {
    pub fn new() -> Self {
        Self {
            state: None,
            handler: ptr::null_mut(),
            env: Box::new(Checkpoint {
                gprs: [0; 10],
                xmm: [0; 10],
            }),
        }
    }
}

impl FaultInterceptor for SehInterceptor {
    fn name(&self) -> &'static str {
        "seh"
    }

    fn arm(&mut self) -> Result<ArmToken, InterceptorError> {
        if self.state.is_some() {
            return Err(InterceptorError::AlreadyArmed);
        }
        let state = InterceptorState::claim()?;
        // SAFETY: on_exception matches PVECTORED_EXCEPTION_HANDLER.
        let handle = unsafe { AddVectoredExceptionHandler(1, on_exception) };
        if handle.is_null() {
            return Err(InterceptorError::Install {
                what: "vectored exception handler",
                source: io::Error::last_os_error(),
            });
        }
        self.handler = handle;
        self.state = Some(state);
        debug!("seh interceptor armed");
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
        let env: *mut Checkpoint = &mut *self.env;
        let mut result = None;
        // SAFETY: env lives in self for the whole call.
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
        let handle = std::mem::replace(&mut self.handler, ptr::null_mut());
        // SAFETY: handle came from AddVectoredExceptionHandler.
        let removed = unsafe { RemoveVectoredExceptionHandler(handle) };
        drop(state);
        debug!("seh interceptor disarmed");
        if removed == 0 {
            return Err(InterceptorError::Restore {
                what: "vectored exception handler",
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn is_armed(&self) -> bool {
        self.state.is_some()
    }
}

impl Drop for SehInterceptor {
    fn drop(&mut self) {
        let _ = self.disarm();
    }
}
