// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Page-granular memory regions with a trailing no-access guard page.
//!
//! A [`GuardedRegion`] is `round_up(len, page) + page` bytes of fresh,
//! zeroed address space. The last page is made inaccessible before the
//! region is handed out, so any write running off the end of the usable
//! part traps on the first guard byte instead of landing in whatever
//! the allocator placed next door.
//!
//! Regions abandoned by a fault are never unmapped. Each faulted heap run
//! therefore costs at least two pages of address space for the lifetime of
//! the process, and a long trial series grows the mapping count linearly.

use std::io;
use std::ptr::NonNull;

use thiserror::Error;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as sys;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as sys;

/// Errors raised by the underlying reservation and protection calls.
#[derive(Debug, Error)]
pub enum MemError {
    #[error("page size query failed: {0}")]
    PageSize(#[source] io::Error),
    #[error("guarded region for {0} bytes overflows the address space")]
    Overflow(usize),
    #[error("reserving {len} bytes failed: {source}")]
    Reserve {
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("protecting guard page at {addr:#x} failed: {source}")]
    Protect {
        addr: usize,
        #[source]
        source: io::Error,
    },
    #[error("releasing {len} bytes at {addr:#x} failed: {source}")]
    Release {
        addr: usize,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Size in bytes of one virtual memory page.
pub fn page_size() -> Result<usize, MemError> {
    sys::page_size()
}

/// Round `len` up to a whole number of pages. Zero rounds to one page.
pub fn round_up_to_page(len: usize, page: usize) -> Option<usize> {
    let len = len.max(1);
    let pages = len.checked_add(page - 1)? / page;
    pages.checked_mul(page)
}

/// Usable pages followed by one inaccessible guard page.
///
/// No `Drop` impl: a region may be abandoned mid-write when a fault
/// transfers control out of the frame that owns it. Such a region, guard
/// page included, stays mapped for the rest of the process. Call
/// [`GuardedRegion::release`] on the paths that complete normally.
#[derive(Debug)]
pub struct GuardedRegion {
    base: NonNull<u8>,
    usable_len: usize,
    page_size: usize,
}

impl GuardedRegion {
    /// Reserve room for `len` bytes plus a trailing guard page.
    ///
    /// The guard page is inaccessible by the time this returns.
    pub fn reserve(len: usize) -> Result<Self, MemError> {
        let page = page_size()?;
        let usable_len = round_up_to_page(len, page).ok_or(MemError::Overflow(len))?;
        let total = usable_len
            .checked_add(page)
            .ok_or(MemError::Overflow(len))?;

        let base = sys::map(total)?;
        // SAFETY: usable_len < total, so the guard page lies inside the mapping.
        let guard = unsafe { base.as_ptr().add(usable_len) };
        if let Err(err) = sys::protect_none(guard, page) {
            let _ = sys::unmap(base.as_ptr(), total);
            return Err(err);
        }
        Ok(Self {
            base,
            usable_len,
            page_size: page,
        })
    }

    /// First byte of the mapping.
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Accessible bytes in front of the guard page.
    pub fn usable_len(&self) -> usize {
        self.usable_len
    }

    /// Usable bytes plus the guard page.
    pub fn total_len(&self) -> usize {
        self.usable_len + self.page_size
    }

    /// First byte of the guard page.
    pub fn guard_start(&self) -> *mut u8 {
        // SAFETY: usable_len is within the mapping.
        unsafe { self.base.as_ptr().add(self.usable_len) }
    }

    /// Pointer to the last `len` usable bytes, i.e. a buffer that ends
    /// flush against the guard page. `None` if `len` exceeds the usable part.
    pub fn tail(&self, len: usize) -> Option<*mut u8> {
        if len > self.usable_len {
            return None;
        }
        // SAFETY: len <= usable_len, so the result stays inside the mapping.
        Some(unsafe { self.guard_start().sub(len) })
    }

    /// Return the whole mapping, guard page included, to the system.
    pub fn release(self) -> Result<(), MemError> {
        sys::unmap(self.base.as_ptr(), self.total_len())
    }
}
