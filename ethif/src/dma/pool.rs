//! Buffer pool management.
//!
//! All `N` buffers are allocated once at bring-up and never freed; the pool
//! only moves buffer ids between the free list and the roles tracked by
//! each buffer's [`BufferOwnership`].

use heapless::{Deque, Vec};
use log::{error, info};

use super::buffer::{BufferId, DmaBuffer};
use super::ownership::BufferOwnership;
use crate::error::{EthError, Result};
use crate::hal::DmaOps;

/// Pre-allocated pool of `N` DMA buffers with a FIFO free list.
pub struct BufferPool<const N: usize> {
    /// Array of DMA buffers, indexed by `BufferId`.
    buffers: Vec<DmaBuffer, N>,
    /// Ids of free buffers, oldest release first.
    free_list: Deque<BufferId, N>,
    /// Size of each buffer.
    buffer_size: usize,
}

impl<const N: usize> BufferPool<N> {
    /// Allocate every buffer from `dma`.
    ///
    /// Each buffer is cleaned and invalidated once so no stale line can be
    /// written back over device data later. Any single failure aborts the
    /// whole pool; no partially built pool is ever returned.
    pub fn new<A: DmaOps>(dma: &mut A, buffer_size: usize, align: usize) -> Result<Self> {
        if N == 0 || N > crate::config::MAX_POOL_SIZE {
            return Err(EthError::InvalidConfig("pool size out of range"));
        }

        let mut buffers = Vec::new();
        let mut free_list = Deque::new();

        for i in 0..N {
            let region = dma.alloc(buffer_size, align).map_err(|source| {
                error!("[ethif] DMA alloc failed for buffer {}/{}: {}", i, N, source);
                EthError::DmaAlloc { index: i, source }
            })?;
            dma.cache_clean_invalidate(region.cpu_ptr, buffer_size);

            let id = BufferId(i as u16);
            // SAFETY: the region was just handed out by the DMA allocator.
            let buf = unsafe { DmaBuffer::new(region, id) };
            buffers
                .push(buf)
                .map_err(|_| EthError::InvalidConfig("pool overflow"))?;
            free_list
                .push_back(id)
                .map_err(|_| EthError::InvalidConfig("free list overflow"))?;
        }

        info!("[ethif] buffer pool ready: {} x {} bytes", N, buffer_size);

        Ok(Self {
            buffers,
            free_list,
            buffer_size,
        })
    }

    /// Take the oldest free buffer and hand it to `role`.
    ///
    /// Returns `None` if the pool is exhausted.
    pub fn allocate(&mut self, role: BufferOwnership) -> Option<BufferId> {
        debug_assert!(!role.is_free(), "allocate needs an owning role");
        let id = self.free_list.pop_front()?;
        self.buffers[id.index()].transition(role);
        Some(id)
    }

    /// Return a buffer to the free list.
    ///
    /// # Panics
    /// Out-of-range ids, a full free list and double frees are broken
    /// invariants, not runtime conditions.
    pub fn release(&mut self, id: BufferId) {
        assert!(id.index() < self.buffers.len(), "BUG: release of out-of-range {}", id);
        assert!(
            !self.free_list.is_full(),
            "BUG: free list full while releasing {} (double free)",
            id
        );
        let buf = &mut self.buffers[id.index()];
        assert!(!buf.ownership().is_free(), "BUG: double free of {}", id);
        buf.transition(BufferOwnership::Free);
        if self.free_list.push_back(id).is_err() {
            unreachable!("free list checked for space above");
        }
    }

    /// Move an allocated buffer between owning roles.
    pub(crate) fn set_ownership(&mut self, id: BufferId, next: BufferOwnership) {
        assert!(!next.is_free(), "BUG: use release() to free {}", id);
        self.get_mut(id).transition(next);
    }

    /// Get buffer by id.
    ///
    /// # Panics
    /// Panics if `id` is out of range.
    pub fn get(&self, id: BufferId) -> &DmaBuffer {
        match self.buffers.get(id.index()) {
            Some(buf) => buf,
            None => panic!("BUG: out-of-range {}", id),
        }
    }

    /// Get mutable buffer by id.
    ///
    /// # Panics
    /// Panics if `id` is out of range.
    pub fn get_mut(&mut self, id: BufferId) -> &mut DmaBuffer {
        match self.buffers.get_mut(id.index()) {
            Some(buf) => buf,
            None => panic!("BUG: out-of-range {}", id),
        }
    }

    /// Number of free buffers.
    pub fn available(&self) -> usize {
        self.free_list.len()
    }

    /// Total number of buffers.
    pub fn total(&self) -> usize {
        self.buffers.len()
    }

    /// Number of buffers owned by some role.
    pub fn in_use(&self) -> usize {
        self.total() - self.available()
    }

    pub fn is_exhausted(&self) -> bool {
        self.free_list.is_empty()
    }

    /// All buffers are free.
    pub fn is_full(&self) -> bool {
        self.available() == self.total()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Free list contents, next-to-allocate first.
    pub fn free_ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.free_list.iter().copied()
    }

    /// Number of buffers currently in `state`.
    pub fn count(&self, state: BufferOwnership) -> usize {
        self.buffers.iter().filter(|b| b.ownership() == state).count()
    }

    /// Iterate over all buffers.
    pub fn iter(&self) -> impl Iterator<Item = &DmaBuffer> {
        self.buffers.iter()
    }
}
