//! Data cache maintenance by virtual address range.
//!
//! aarch64 uses `dc` by-VA operations followed by `dsb sy`. x86_64 DMA is
//! coherent for write-back memory; `clflush` is still issued so buffers
//! mapped uncached-but-speculated or through a non-snooping IOMMU stay
//! consistent. Other targets only get a fence.

use core::sync::atomic::{fence, Ordering};

/// Cache line size assumed for range walks.
pub const CACHE_LINE: usize = 64;

#[inline]
fn lines(addr: *const u8, len: usize) -> impl Iterator<Item = usize> {
    let start = addr as usize & !(CACHE_LINE - 1);
    // nothing to walk for an empty range, even when addr is unaligned
    let end = if len == 0 { start } else { addr as usize + len };
    (start..end).step_by(CACHE_LINE)
}

/// Clean `[addr, addr + len)` to the point of coherency.
///
/// # Safety
/// The range must be mapped.
pub unsafe fn clean(addr: *const u8, len: usize) {
    for _line in lines(addr, len) {
        #[cfg(target_arch = "aarch64")]
        core::arch::asm!("dc cvac, {}", in(reg) _line, options(nostack, preserves_flags));
        #[cfg(target_arch = "x86_64")]
        core::arch::x86_64::_mm_clflush(_line as *const u8);
    }
    barrier();
}

/// Invalidate `[addr, addr + len)`.
///
/// # Safety
/// The range must be mapped, and any dirty CPU data in it is discarded.
pub unsafe fn invalidate(addr: *const u8, len: usize) {
    for _line in lines(addr, len) {
        #[cfg(target_arch = "aarch64")]
        core::arch::asm!("dc ivac, {}", in(reg) _line, options(nostack, preserves_flags));
        #[cfg(target_arch = "x86_64")]
        core::arch::x86_64::_mm_clflush(_line as *const u8);
    }
    barrier();
}

/// Clean then invalidate `[addr, addr + len)`.
///
/// # Safety
/// The range must be mapped.
pub unsafe fn clean_invalidate(addr: *const u8, len: usize) {
    for _line in lines(addr, len) {
        #[cfg(target_arch = "aarch64")]
        core::arch::asm!("dc civac, {}", in(reg) _line, options(nostack, preserves_flags));
        #[cfg(target_arch = "x86_64")]
        core::arch::x86_64::_mm_clflush(_line as *const u8);
    }
    barrier();
}

#[inline]
fn barrier() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: barrier only.
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }
    #[cfg(target_arch = "x86_64")]
    // SAFETY: barrier only.
    unsafe {
        core::arch::x86_64::_mm_mfence();
    }
    fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_walk_covers_unaligned_range() {
        let walked: std::vec::Vec<usize> = lines(0x1030 as *const u8, 0x50).collect();
        assert_eq!(walked, [0x1000, 0x1040]);
    }

    #[test]
    fn test_empty_range_walks_nothing() {
        assert_eq!(lines(0x1000 as *const u8, 0).count(), 0);
        assert_eq!(lines(0x1030 as *const u8, 0).count(), 0);
    }
}
