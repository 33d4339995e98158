//! Bump allocator over a pre-mapped DMA window.
//!
//! The platform hands the driver one physically contiguous region that is
//! mapped at some virtual address (not necessarily identity-mapped). This
//! crate carves fixed allocations out of it once at bring-up; nothing is
//! ever returned individually.
//!
//! # Usage
//!
//! ```ignore
//! use dma_pool::DmaWindow;
//!
//! // vaddr/paddr come from the platform (frame cap mapping, linker script, ...)
//! let mut window = unsafe { DmaWindow::new(vaddr, paddr, 2 * 1024 * 1024)? };
//!
//! // Allocate a 2KB buffer aligned to 2KB (alignment applies to paddr)
//! let (paddr, vaddr) = window.alloc(2048, 2048)?;
//! ```

#![no_std]

use core::ptr::NonNull;

// ============================================================================
// Utility functions
// ============================================================================

/// Align a value up to the given alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

// ============================================================================
// Error types
// ============================================================================

/// DMA window errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Requested 0 bytes.
    ZeroSize,
    /// Alignment is not a power of two.
    BadAlignment,
    /// Not enough memory left in the window.
    OutOfMemory,
    /// Window base or size is unusable.
    InvalidRegion,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroSize => write!(f, "zero-sized DMA allocation"),
            Self::BadAlignment => write!(f, "DMA alignment is not a power of two"),
            Self::OutOfMemory => write!(f, "DMA window exhausted"),
            Self::InvalidRegion => write!(f, "invalid DMA window"),
        }
    }
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

// ============================================================================
// DmaWindow
// ============================================================================

/// A contiguous DMA-capable region with a bump allocation cursor.
///
/// Alignment is applied to the physical address, since that is what the
/// device sees. The virtual address keeps the same offset from the base.
pub struct DmaWindow {
    /// CPU-visible base.
    virt_base: NonNull<u8>,
    /// Device-visible base.
    phys_base: u64,
    /// Window size in bytes.
    size: usize,
    /// Bump offset from the base.
    offset: usize,
}

impl DmaWindow {
    /// Create a window over an already-mapped region.
    ///
    /// # Safety
    /// - `virt_base` must be valid for reads and writes of `size` bytes
    /// - `phys_base` must be the device-visible address of `virt_base`
    /// - the region must be physically contiguous and not used by anything else
    /// - the region must stay mapped for the lifetime of the window and of
    ///   every allocation made from it
    pub unsafe fn new(virt_base: NonNull<u8>, phys_base: u64, size: usize) -> Result<Self> {
        if size == 0 || phys_base.checked_add(size as u64).is_none() {
            return Err(DmaError::InvalidRegion);
        }
        Ok(Self {
            virt_base,
            phys_base,
            size,
            offset: 0,
        })
    }

    /// Allocate `size` bytes with the physical address aligned to `align`.
    ///
    /// Returns (physical_address, virtual_address). Memory is zeroed.
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<(u64, NonNull<u8>)> {
        if size == 0 {
            return Err(DmaError::ZeroSize);
        }
        if align == 0 || !align.is_power_of_two() {
            return Err(DmaError::BadAlignment);
        }

        let cursor = self.phys_base + self.offset as u64;
        let aligned = cursor
            .checked_add(align as u64 - 1)
            .ok_or(DmaError::OutOfMemory)?
            & !(align as u64 - 1);
        let start = usize::try_from(aligned - self.phys_base).map_err(|_| DmaError::OutOfMemory)?;
        let end = start.checked_add(size).ok_or(DmaError::OutOfMemory)?;
        if end > self.size {
            return Err(DmaError::OutOfMemory);
        }

        self.offset = end;

        // SAFETY: start..end lies inside the window per the constructor contract.
        let vaddr = unsafe {
            let ptr = self.virt_base.as_ptr().add(start);
            core::ptr::write_bytes(ptr, 0, size);
            NonNull::new_unchecked(ptr)
        };
        Ok((aligned, vaddr))
    }

    /// Translate a device address inside the window to its CPU pointer.
    pub fn phys_to_virt(&self, paddr: u64) -> Option<NonNull<u8>> {
        let off = paddr.checked_sub(self.phys_base)?;
        if off >= self.size as u64 {
            return None;
        }
        // SAFETY: offset is inside the window.
        Some(unsafe { NonNull::new_unchecked(self.virt_base.as_ptr().add(off as usize)) })
    }

    /// Translate a CPU pointer inside the window to its device address.
    pub fn virt_to_phys(&self, vaddr: NonNull<u8>) -> Option<u64> {
        let off = (vaddr.as_ptr() as usize).checked_sub(self.virt_base.as_ptr() as usize)?;
        if off >= self.size {
            return None;
        }
        Some(self.phys_base + off as u64)
    }

    /// Get remaining free space in bytes (before alignment padding).
    pub fn free_space(&self) -> usize {
        self.size - self.offset
    }
}

// SAFETY: the window only hands out disjoint ranges; the raw base pointer is
// never dereferenced outside `alloc`, which takes `&mut self`.
unsafe impl Send for DmaWindow {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec;

    fn window(bytes: &mut [u8], phys: u64) -> DmaWindow {
        let base = NonNull::new(bytes.as_mut_ptr()).unwrap();
        unsafe { DmaWindow::new(base, phys, bytes.len()).unwrap() }
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 4096), 0);
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
    }

    #[test]
    fn test_alloc_aligns_physical_address() {
        let mut mem = vec![0xAAu8; 16 * 1024];
        let mut win = window(&mut mem, 0x8000_0100);

        let (p0, v0) = win.alloc(100, 2048).unwrap();
        assert_eq!(p0 % 2048, 0);
        assert_eq!(p0, 0x8000_0800);
        assert_eq!(win.virt_to_phys(v0), Some(p0));
        assert_eq!(win.phys_to_virt(p0), Some(v0));

        let (p1, _) = win.alloc(2048, 2048).unwrap();
        assert_eq!(p1, 0x8000_1000);
    }

    #[test]
    fn test_alloc_zeroes_memory() {
        let mut mem = vec![0xAAu8; 4096];
        let mut win = window(&mut mem, 0x1000);
        let (_, v) = win.alloc(64, 64).unwrap();
        let bytes = unsafe { core::slice::from_raw_parts(v.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_alloc_errors() {
        let mut mem = vec![0u8; 4096];
        let mut win = window(&mut mem, 0x1000);
        assert_eq!(win.alloc(0, 8), Err(DmaError::ZeroSize));
        assert_eq!(win.alloc(8, 3), Err(DmaError::BadAlignment));
        assert_eq!(win.alloc(8192, 8), Err(DmaError::OutOfMemory));

        win.alloc(4096, 4096).unwrap();
        assert_eq!(win.free_space(), 0);
        assert_eq!(win.alloc(1, 1), Err(DmaError::OutOfMemory));
    }

    #[test]
    fn test_alignment_overflow_is_out_of_memory() {
        let mut mem = vec![0u8; 4096];
        // window ends 4KB below the top of the physical address space
        let mut win = window(&mut mem, u64::MAX - 8191);
        assert_eq!(win.alloc(64, 1 << 20), Err(DmaError::OutOfMemory));
        assert!(win.alloc(64, 64).is_ok());
    }

    #[test]
    fn test_translation_out_of_range() {
        let mut mem = vec![0u8; 4096];
        let win = window(&mut mem, 0x1000);
        assert!(win.phys_to_virt(0x0FFF).is_none());
        assert!(win.phys_to_virt(0x2000).is_none());
        assert!(win.phys_to_virt(0x1FFF).is_some());
    }
}
