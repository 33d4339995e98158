//! `DmaOps` over a single pre-mapped DMA window.
//!
//! Suitable when the platform maps one physically contiguous region for the
//! driver at bring-up (a frame capability mapping under a microkernel, a
//! linker-reserved region on bare metal). Allocation is a bump cursor from
//! the `dma-pool` crate; cache maintenance uses [`super::cache`].

use core::ptr::NonNull;

use dma_pool::{DmaError, DmaWindow};

use super::{cache, DmaOps};
use crate::dma::DmaRegion;

/// DMA allocator backed by one contiguous window.
pub struct RegionDma {
    window: DmaWindow,
}

impl RegionDma {
    /// Wrap an already-mapped window.
    ///
    /// # Safety
    /// Same contract as [`DmaWindow::new`]: the range must be mapped,
    /// physically contiguous, exclusively ours and live for the lifetime of
    /// every buffer allocated from it.
    pub unsafe fn new(virt_base: NonNull<u8>, phys_base: u64, size: usize) -> Result<Self, DmaError> {
        Ok(Self {
            window: DmaWindow::new(virt_base, phys_base, size)?,
        })
    }

    /// Window size needed for `count` buffers of `size` bytes at `align`.
    pub const fn required_size(count: usize, size: usize, align: usize) -> usize {
        // worst case: every buffer padded up to the next alignment boundary
        count * dma_pool::align_up(size, align) + align
    }

    /// CPU pointer for a device address inside the window.
    pub fn phys_to_virt(&self, paddr: u64) -> Option<NonNull<u8>> {
        self.window.phys_to_virt(paddr)
    }

    /// Device address for a CPU pointer inside the window.
    pub fn virt_to_phys(&self, vaddr: NonNull<u8>) -> Option<u64> {
        self.window.virt_to_phys(vaddr)
    }

    /// Bytes left in the window.
    pub fn free_space(&self) -> usize {
        self.window.free_space()
    }
}

impl DmaOps for RegionDma {
    fn alloc(&mut self, size: usize, align: usize) -> Result<DmaRegion, DmaError> {
        let (paddr, vaddr) = self.window.alloc(size, align)?;
        Ok(DmaRegion::new(vaddr, paddr, size))
    }

    fn cache_clean(&mut self, vaddr: NonNull<u8>, len: usize) {
        // SAFETY: callers only pass ranges inside buffers allocated here.
        unsafe { cache::clean(vaddr.as_ptr(), len) }
    }

    fn cache_invalidate(&mut self, vaddr: NonNull<u8>, len: usize) {
        // SAFETY: as above.
        unsafe { cache::invalidate(vaddr.as_ptr(), len) }
    }

    fn cache_clean_invalidate(&mut self, vaddr: NonNull<u8>, len: usize) {
        // SAFETY: as above.
        unsafe { cache::clean_invalidate(vaddr.as_ptr(), len) }
    }
}
