// CLASSIFICATION: COMMUNITY
// Filename: unix.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

use std::io;
use std::ptr::{self, NonNull};

use super::MemError;

pub(super) fn page_size() -> Result<usize, MemError> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(MemError::PageSize(io::Error::last_os_error()));
    }
    Ok(size as usize)
}

pub(super) fn map(len: usize) -> Result<NonNull<u8>, MemError> {
    // SAFETY: anonymous private mapping with no fixed address; the result
    // is checked against MAP_FAILED before use.
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(MemError::Reserve {
            len,
            source: io::Error::last_os_error(),
        });
    }
    NonNull::new(addr.cast::<u8>()).ok_or_else(|| MemError::Reserve {
        len,
        source: io::Error::from(io::ErrorKind::OutOfMemory),
    })
}

pub(super) fn protect_none(addr: *mut u8, len: usize) -> Result<(), MemError> {
    // SAFETY: addr..addr+len is a page-aligned slice of a mapping we own.
    let ret = unsafe { libc::mprotect(addr.cast(), len, libc::PROT_NONE) };
    if ret != 0 {
        return Err(MemError::Protect {
            addr: addr as usize,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

pub(super) fn unmap(addr: *mut u8, len: usize) -> Result<(), MemError> {
    // SAFETY: addr/len describe exactly one mapping returned by `map`.
    let ret = unsafe { libc::munmap(addr.cast(), len) };
    if ret != 0 {
        return Err(MemError::Release {
            addr: addr as usize,
            len,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
