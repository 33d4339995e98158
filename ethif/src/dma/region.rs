//! DMA region definition.

use core::ptr::NonNull;

/// One contiguous allocation visible to both CPU and device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaRegion {
    /// CPU-accessible pointer.
    pub cpu_ptr: NonNull<u8>,
    /// Device-visible bus address.
    pub bus_addr: u64,
    /// Size in bytes.
    pub size: usize,
}

impl DmaRegion {
    /// Describe an allocation returned by the platform DMA allocator.
    pub const fn new(cpu_ptr: NonNull<u8>, bus_addr: u64, size: usize) -> Self {
        Self { cpu_ptr, bus_addr, size }
    }
}

// SAFETY: a region is a plain description; access goes through `DmaBuffer`,
// which enforces ownership.
unsafe impl Send for DmaRegion {}
