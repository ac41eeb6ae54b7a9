// CLASSIFICATION: COMMUNITY
// Filename: windows.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::ffi::c_void;
use std::io;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

use super::MemError;

const MEM_COMMIT: u32 = 0x1000;
const MEM_RESERVE: u32 = 0x2000;
const MEM_RELEASE: u32 = 0x8000;
const PAGE_NOACCESS: u32 = 0x01;
const PAGE_READWRITE: u32 = 0x04;

#[allow(dead_code)]
#[repr(C)]
struct SystemInfo {
    processor_architecture: u16,
    reserved: u16,
    page_size: u32,
    minimum_application_address: *mut c_void,
    maximum_application_address: *mut c_void,
    active_processor_mask: usize,
    number_of_processors: u32,
    processor_type: u32,
    allocation_granularity: u32,
    processor_level: u16,
    processor_revision: u16,
}

#[link(name = "kernel32")]
extern "system" {
    fn GetSystemInfo(info: *mut SystemInfo);
    fn VirtualAlloc(addr: *mut c_void, size: usize, alloc_type: u32, protect: u32) -> *mut c_void;
    fn VirtualProtect(addr: *mut c_void, size: usize, protect: u32, old: *mut u32) -> i32;
    fn VirtualFree(addr: *mut c_void, size: usize, free_type: u32) -> i32;
}

pub(super) fn page_size() -> Result<usize, MemError> {
    let mut info = MaybeUninit::<SystemInfo>::uninit();
    // SAFETY: GetSystemInfo fully initialises the out-parameter.
    let info = unsafe {
        GetSystemInfo(info.as_mut_ptr());
        info.assume_init()
    };
    if info.page_size == 0 {
        return Err(MemError::PageSize(io::Error::from(io::ErrorKind::Unsupported)));
    }
    Ok(info.page_size as usize)
}

pub(super) fn map(len: usize) -> Result<NonNull<u8>, MemError> {
    // SAFETY: fresh committed read/write allocation at a system-chosen address.
    let addr = unsafe { VirtualAlloc(ptr::null_mut(), len, MEM_RESERVE | MEM_COMMIT, PAGE_READWRITE) };
    NonNull::new(addr.cast::<u8>()).ok_or_else(|| MemError::Reserve {
        len,
        source: io::Error::last_os_error(),
    })
}

pub(super) fn protect_none(addr: *mut u8, len: usize) -> Result<(), MemError> {
    let mut old = 0u32;
    // SAFETY: addr..addr+len lies within an allocation we own.
    let ok = unsafe { VirtualProtect(addr.cast(), len, PAGE_NOACCESS, &mut old) };
    if ok == 0 {
        return Err(MemError::Protect {
            addr: addr as usize,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

pub(super) fn unmap(addr: *mut u8, len: usize) -> Result<(), MemError> {
    // SAFETY: addr is the base returned by VirtualAlloc; MEM_RELEASE
    // requires a size of zero.
    let ok = unsafe { VirtualFree(addr.cast(), 0, MEM_RELEASE) };
    if ok == 0 {
        return Err(MemError::Release {
            addr: addr as usize,
            len,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
