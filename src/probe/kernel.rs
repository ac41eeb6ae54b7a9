// CLASSIFICATION: COMMUNITY
// Filename: kernel.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Write to a supervisor-reserved virtual address.
//!
//! The default target sits in the half of the address space that user
//! mode can never touch, so the store always traps. A caller-supplied
//! address carries no such guarantee: if it happens to fall inside a
//! writable mapping of this process, the store succeeds and silently
//! corrupts that memory. The probe does not try to detect this; it is
//! the documented behaviour of the probe.

use log::warn;

use super::{FaultProbe, ProbeError, ProbeKind};

/// Canonical supervisor address of the build target.
#[cfg(target_pointer_width = "64")]
pub const DEFAULT_SUPERVISOR_ADDRESS: u64 = 0xFFFF_0000_0000_0000;
/// Canonical supervisor address of the build target (3G/1G split).
#[cfg(target_pointer_width = "32")]
pub const DEFAULT_SUPERVISOR_ADDRESS: u64 = 0xC000_0000;

/// 32-bit word stored at the target address.
pub const WRITE_PATTERN: u32 = 0xDEAD_BEEF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelAccessProbe {
    address: u64,
}

impl Default for KernelAccessProbe {
    fn default() -> Self {
        Self {
            address: DEFAULT_SUPERVISOR_ADDRESS,
        }
    }
}

impl KernelAccessProbe {
    pub fn new(address: u64) -> Result<Self, ProbeError> {
        let target = usize::try_from(address).map_err(|_| ProbeError::AddressOutOfRange(address))?;
        if !store::can_target(target) {
            return Err(ProbeError::UnwritableAddress(address));
        }
        if address != DEFAULT_SUPERVISOR_ADDRESS {
            warn!(
                "kernel probe targets {:#x}; a writable mapping there will be corrupted instead of faulting",
                address
            );
        }
        Ok(Self { address })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn is_default_address(&self) -> bool {
        self.address == DEFAULT_SUPERVISOR_ADDRESS
    }
}

impl FaultProbe for KernelAccessProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Kernel
    }

    fn execute(&mut self) -> Result<(), ProbeError> {
        // `new` already checked the address fits a pointer.
        let target = self.address as usize;
        // SAFETY: none; the store is expected to trap. See the module docs
        // for what happens when it does not.
        unsafe { store::write_word(target, WRITE_PATTERN) };
        Ok(())
    }
}

// The store is emitted as a single instruction on the common targets so
// the compiler cannot reason about, reorder or drop an access to memory
// it knows nothing about.
mod store {
    #[cfg(target_arch = "x86_64")]
    pub(super) unsafe fn write_word(addr: usize, value: u32) {
        // SAFETY: see caller.
        unsafe {
            std::arch::asm!(
                "mov dword ptr [{addr}], {value:e}",
                addr = in(reg) addr,
                value = in(reg) value,
                options(nostack, preserves_flags),
            );
        }
    }

    #[cfg(target_arch = "aarch64")]
    pub(super) unsafe fn write_word(addr: usize, value: u32) {
        // SAFETY: see caller.
        unsafe {
            std::arch::asm!(
                "str {value:w}, [{addr}]",
                addr = in(reg) addr,
                value = in(reg) value,
                options(nostack, preserves_flags),
            );
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    pub(super) unsafe fn write_word(addr: usize, value: u32) {
        // SAFETY: see caller; `can_target` rejected null and misaligned targets.
        unsafe { std::ptr::write_volatile(addr as *mut u32, value) };
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    pub(super) fn can_target(_addr: usize) -> bool {
        true
    }

    // write_volatile requires a non-null, aligned pointer.
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    pub(super) fn can_target(addr: usize) -> bool {
        addr != 0 && addr % std::mem::align_of::<u32>() == 0
    }
}
