//! DMA buffer with ownership tracking.

use core::fmt;
use core::ptr::NonNull;

use super::ownership::BufferOwnership;
use super::region::DmaRegion;

/// Index of a buffer within its pool.
///
/// Doubles as the completion cookie handed to hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u16);

impl BufferId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf#{}", self.0)
    }
}

/// A single DMA buffer with ownership tracking.
///
/// Tracks both CPU and bus addresses, plus ownership state.
pub struct DmaBuffer {
    /// Backing allocation.
    region: DmaRegion,
    /// Current ownership state.
    ownership: BufferOwnership,
    /// Buffer index within the pool.
    id: BufferId,
}

impl DmaBuffer {
    /// Wrap a platform allocation.
    ///
    /// # Safety
    /// - `region.cpu_ptr` must point to `region.size` bytes of DMA-capable memory
    /// - `region.bus_addr` must be the corresponding device-visible address
    /// - nothing else may alias the region
    pub unsafe fn new(region: DmaRegion, id: BufferId) -> Self {
        Self {
            region,
            ownership: BufferOwnership::Free,
            id,
        }
    }

    /// First `len` bytes as a slice.
    ///
    /// # Panics
    /// Panics if the CPU does not own the buffer or `len > capacity`.
    pub fn as_slice(&self, len: usize) -> &[u8] {
        self.assert_access(len);
        // SAFETY: region is valid for `size` bytes and not device-owned.
        unsafe { core::slice::from_raw_parts(self.region.cpu_ptr.as_ptr(), len) }
    }

    /// First `len` bytes as a mutable slice.
    ///
    /// # Panics
    /// Panics if the CPU does not own the buffer or `len > capacity`.
    pub fn as_mut_slice(&mut self, len: usize) -> &mut [u8] {
        self.assert_access(len);
        // SAFETY: as above; `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.region.cpu_ptr.as_ptr(), len) }
    }

    fn assert_access(&self, len: usize) {
        assert!(
            self.ownership.can_access(),
            "BUG: {} accessed while {:?}",
            self.id,
            self.ownership
        );
        assert!(len <= self.region.size, "Requested length exceeds buffer capacity");
    }

    /// Device-visible bus address.
    pub fn bus_addr(&self) -> u64 {
        self.region.bus_addr
    }

    /// CPU pointer.
    pub fn cpu_ptr(&self) -> NonNull<u8> {
        self.region.cpu_ptr
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.region.size
    }

    pub fn ownership(&self) -> BufferOwnership {
        self.ownership
    }

    /// Move to `next`.
    ///
    /// # Panics
    /// Illegal edges are a broken invariant and panic.
    pub(crate) fn transition(&mut self, next: BufferOwnership) {
        assert!(
            self.ownership.can_transition(next),
            "BUG: illegal ownership transition for {}: {:?} -> {:?}",
            self.id,
            self.ownership,
            next
        );
        self.ownership = next;
    }
}

impl fmt::Debug for DmaBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaBuffer")
            .field("id", &self.id)
            .field("bus_addr", &format_args!("{:#x}", self.region.bus_addr))
            .field("capacity", &self.region.size)
            .field("ownership", &self.ownership)
            .finish()
    }
}

unsafe impl Send for DmaBuffer {}
