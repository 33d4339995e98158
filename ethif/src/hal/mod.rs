//! Hardware abstraction for DMA memory and cache maintenance.
//!
//! The buffer core never touches caches or the platform allocator
//! directly; it goes through [`DmaOps`]. Cache operations are issued only
//! at ownership-transfer points:
//!
//! | point                        | operation           |
//! |------------------------------|---------------------|
//! | pool bring-up                | clean + invalidate  |
//! | RX buffer posted to hardware | invalidate          |
//! | RX frame landed / delivered  | invalidate (len)    |
//! | TX payload copied            | clean (len)         |

pub mod cache;
pub mod region;

use core::ptr::NonNull;

pub use crate::dma::DmaRegion;
pub use dma_pool::DmaError;
pub use region::RegionDma;

/// Platform DMA allocator and cache maintenance.
pub trait DmaOps {
    /// Allocate `size` bytes of DMA-capable memory aligned to `align`.
    ///
    /// Only called at bring-up; a failure aborts the pool.
    fn alloc(&mut self, size: usize, align: usize) -> Result<DmaRegion, DmaError>;

    /// Write back CPU-dirty lines so the device reads current data.
    fn cache_clean(&mut self, vaddr: NonNull<u8>, len: usize);

    /// Discard cached lines so the CPU reads what the device wrote.
    fn cache_invalidate(&mut self, vaddr: NonNull<u8>, len: usize);

    /// Write back, then discard.
    fn cache_clean_invalidate(&mut self, vaddr: NonNull<u8>, len: usize);
}
