// CLASSIFICATION: COMMUNITY
// Filename: heap.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-16

//! Heap boundary overrun over a guard page.
//!
//! The buffer is carved from the end of a page-rounded region so that its
//! last byte sits immediately before an inaccessible guard page. Writing
//! even one byte past the allocation therefore traps deterministically,
//! independent of any allocator's bookkeeping layout.

use std::ptr;

use crate::mem::{self, GuardedRegion, MemError};

use super::{FaultProbe, ProbeError, ProbeKind};

/// Bytes allocated when no size is given.
pub const DEFAULT_ALLOCATION_SIZE: usize = 16;
/// Bytes written past the allocation when no size is given.
pub const DEFAULT_OVERRUN_SIZE: usize = 1024;
/// Byte written into the overrun area.
pub const OVERRUN_PATTERN: u8 = b'X';

/// Zero-fills an allocation and then writes `overrun_size` pattern bytes
/// past its end.
///
/// A run that faults never returns to release its region, so every faulted
/// run leaves `round_up(allocation_size) + page` bytes mapped until the
/// process exits.
#[derive(Debug, Clone)]
pub struct HeapOverflowProbe {
    allocation_size: usize,
    overrun_size: usize,
    last_allocation: Vec<u8>,
}

impl Default for HeapOverflowProbe {
    fn default() -> Self {
        Self {
            allocation_size: DEFAULT_ALLOCATION_SIZE,
            overrun_size: DEFAULT_OVERRUN_SIZE,
            last_allocation: Vec::new(),
        }
    }
}

impl HeapOverflowProbe {
    pub fn new(allocation_size: usize, overrun_size: usize) -> Result<Self, ProbeError> {
        if allocation_size == 0 {
            return Err(ProbeError::EmptyAllocation);
        }
        Ok(Self {
            allocation_size,
            overrun_size,
            last_allocation: Vec::new(),
        })
    }

    pub fn allocation_size(&self) -> usize {
        self.allocation_size
    }

    pub fn overrun_size(&self) -> usize {
        self.overrun_size
    }

    /// Contents of the allocation as last observed on a run that completed
    /// without faulting. Empty if the last run faulted or none has run.
    pub fn last_allocation(&self) -> &[u8] {
        &self.last_allocation
    }

    /// `(rounded_len, total_len)` of the region this probe reserves for a
    /// given page size: the page-rounded allocation and that plus one guard page.
    pub fn region_layout(&self, page_size: usize) -> Option<(usize, usize)> {
        let rounded = mem::round_up_to_page(self.allocation_size, page_size)?;
        Some((rounded, rounded.checked_add(page_size)?))
    }
}

impl FaultProbe for HeapOverflowProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Heap
    }

    fn execute(&mut self) -> Result<(), ProbeError> {
        self.last_allocation.clear();

        let region = GuardedRegion::reserve(self.allocation_size)?;
        let buf = region
            .tail(self.allocation_size)
            .ok_or(MemError::Overflow(self.allocation_size))?;

        // SAFETY: buf..buf+allocation_size is mapped read/write. Everything
        // from buf+allocation_size on is the guard page, so the overrun traps
        // on its first byte when overrun_size > 0.
        unsafe {
            ptr::write_bytes(buf, 0, self.allocation_size);
            overrun(buf.wrapping_add(self.allocation_size), self.overrun_size);
        }

        // Only reached when nothing was written past the allocation.
        if self
            .last_allocation
            .try_reserve_exact(self.allocation_size)
            .is_err()
        {
            region.release()?;
            return Err(ProbeError::SnapshotTooLarge(self.allocation_size));
        }
        // SAFETY: the allocation is still mapped and was fully initialised above.
        let written = unsafe { std::slice::from_raw_parts(buf, self.allocation_size) };
        self.last_allocation.extend_from_slice(written);
        region.release()?;
        Ok(())
    }
}

/// Byte-at-a-time volatile writes so the store sequence, and with it the
/// exact faulting address, is what the loop says.
#[inline(never)]
unsafe fn overrun(start: *mut u8, count: usize) {
    for i in 0..count {
        // SAFETY: intentionally unchecked; the caller expects this to trap.
        unsafe { ptr::write_volatile(start.wrapping_add(i), OVERRUN_PATTERN) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_allocation() {
        assert!(matches!(
            HeapOverflowProbe::new(0, 8),
            Err(ProbeError::EmptyAllocation)
        ));
    }

    #[test]
    fn defaults_match_harness_defaults() {
        let probe = HeapOverflowProbe::default();
        assert_eq!(probe.allocation_size(), 16);
        assert_eq!(probe.overrun_size(), 1024);
        assert_eq!(probe.kind(), ProbeKind::Heap);
    }

    #[test]
    fn layout_adds_one_guard_page() {
        let probe = HeapOverflowProbe::new(5000, 0).unwrap();
        assert_eq!(probe.region_layout(4096), Some((8192, 12288)));
        let small = HeapOverflowProbe::new(16, 0).unwrap();
        assert_eq!(small.region_layout(4096), Some((4096, 8192)));
    }

    // With no overrun the operation never leaves mapped memory, so it is
    // safe to call without any interceptor installed.
    #[test]
    fn zero_overrun_leaves_zeroed_allocation() {
        let mut probe = HeapOverflowProbe::new(16, 0).unwrap();
        probe.execute().unwrap();
        assert_eq!(probe.last_allocation(), &[0u8; 16]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn unmappable_allocation_is_a_setup_error() {
        let mut probe = HeapOverflowProbe::new(1 << 62, 0).unwrap();
        assert!(matches!(
            probe.execute(),
            Err(ProbeError::Mem(MemError::Reserve { .. }))
        ));
        assert!(probe.last_allocation().is_empty());
    }

    #[test]
    fn page_sized_allocation_without_overrun_completes() {
        let page = mem::page_size().unwrap();
        let mut probe = HeapOverflowProbe::new(page, 0).unwrap();
        probe.execute().unwrap();
        assert_eq!(probe.last_allocation().len(), page);
        assert!(probe.last_allocation().iter().all(|&b| b == 0));
    }
}
