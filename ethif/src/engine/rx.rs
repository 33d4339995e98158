//! Receive path.
//!
//! Poll-based receive - never block! Queue overflow drops the newest frame.

use log::{debug, warn};

use super::{BufferEngine, DropReason, RxEntry, RxOutcome};
use crate::device::FrameSink;
use crate::dma::{BufferId, BufferOwnership};
use crate::driver::{RxFragment, RxSlot};
use crate::error::{EthError, Result};
use crate::hal::DmaOps;
use crate::stats::bump;

impl<A: DmaOps, const N: usize> BufferEngine<A, N> {
    /// Hand out a buffer for the device to receive into.
    ///
    /// The whole buffer is invalidated first so no dirty line can be evicted
    /// over incoming DMA data.
    pub fn allocate_rx_buffer(&mut self, size: usize) -> Result<RxSlot> {
        let max = self.pool.buffer_size();
        if size > max {
            warn!("[ethif] rx buffer request of {} bytes too large, max {}", size, max);
            return Err(EthError::FrameTooLarge { len: size, max });
        }

        let Some(id) = self.pool.allocate(BufferOwnership::RxPosted) else {
            if bump(&mut self.stats.pool_exhausted) {
                debug!("[ethif] out of DMA buffers for rx ({} times)", self.stats.pool_exhausted);
            }
            return Err(EthError::PoolExhausted);
        };
        self.rx_posted += 1;

        let buf = self.pool.get(id);
        let (ptr, paddr, capacity) = (buf.cpu_ptr(), buf.bus_addr(), buf.capacity());
        self.dma.cache_invalidate(ptr, capacity);

        Ok(RxSlot { cookie: id, paddr, capacity })
    }

    /// Take back a posted buffer the device never used.
    pub fn cancel_rx(&mut self, id: BufferId) {
        self.reclaim_posted(id);
    }

    /// Handle a receive completion.
    ///
    /// - several fragments: split frame, every buffer reclaimed, dropped
    /// - bad length: buffer reclaimed, dropped
    /// - queue full: buffer reclaimed, `Err(RxQueueFull)`
    /// - otherwise invalidated over `len` and queued
    pub fn on_frame_received(&mut self, fragments: &[RxFragment]) -> Result<RxOutcome> {
        let frag = match fragments {
            [] => return Ok(RxOutcome::Ignored),
            [single] => *single,
            _ => {
                for f in fragments {
                    self.reclaim_posted(f.cookie);
                }
                if bump(&mut self.stats.rx_split_dropped) {
                    warn!(
                        "[ethif] frame splitting not handled, dropped frame across {} buffers ({} total)",
                        fragments.len(),
                        self.stats.rx_split_dropped
                    );
                }
                return Ok(RxOutcome::Dropped(DropReason::SplitFrame {
                    buffers: fragments.len(),
                }));
            }
        };

        self.expect_state(frag.cookie, BufferOwnership::RxPosted);
        let buf = self.pool.get(frag.cookie);
        let (ptr, capacity) = (buf.cpu_ptr(), buf.capacity());

        if frag.len == 0 || frag.len > capacity {
            self.reclaim_posted(frag.cookie);
            if bump(&mut self.stats.rx_bad_length) {
                warn!("[ethif] dropped rx frame with bad length {} (capacity {})", frag.len, capacity);
            }
            return Ok(RxOutcome::Dropped(DropReason::BadLength { len: frag.len }));
        }

        self.dma.cache_invalidate(ptr, frag.len);

        if self.rx_queue.len() >= self.rx_capacity {
            self.reclaim_posted(frag.cookie);
            if bump(&mut self.stats.rx_queue_full) {
                debug!("[ethif] rx queue full, dropping newest ({} times)", self.stats.rx_queue_full);
            }
            return Err(EthError::RxQueueFull);
        }

        self.pool.set_ownership(frag.cookie, BufferOwnership::RxQueued);
        self.rx_posted -= 1;
        if self.rx_queue.push_back(RxEntry { id: frag.cookie, len: frag.len }).is_err() {
            unreachable!("rx capacity never exceeds pool size");
        }
        self.stats.rx_frames += 1;
        Ok(RxOutcome::Queued)
    }

    /// Deliver up to `budget` queued frames to `sink`.
    ///
    /// Each frame is invalidated again right before delivery and its buffer
    /// is released as soon as `sink` returns. Returns the unused budget.
    pub fn drain<S: FrameSink + ?Sized>(&mut self, budget: usize, sink: &mut S) -> usize {
        let mut remaining = budget;
        while remaining > 0 {
            let Some(entry) = self.begin_delivery() else {
                break;
            };
            sink.ingest(self.pool.get(entry.id).as_slice(entry.len));
            self.finish_delivery(entry);
            remaining -= 1;
        }
        remaining
    }

    /// Pop the oldest queued frame and lend it out.
    pub(crate) fn begin_delivery(&mut self) -> Option<RxEntry> {
        let entry = self.rx_queue.pop_front()?;
        self.pool.set_ownership(entry.id, BufferOwnership::RxDelivering);
        self.rx_delivering += 1;

        let ptr = self.pool.get(entry.id).cpu_ptr();
        self.dma.cache_invalidate(ptr, entry.len);
        Some(entry)
    }

    /// The stack is done with a lent frame.
    pub(crate) fn finish_delivery(&mut self, entry: RxEntry) {
        self.expect_state(entry.id, BufferOwnership::RxDelivering);
        self.rx_delivering -= 1;
        self.pool.release(entry.id);
        self.stats.rx_delivered += 1;
    }

    fn reclaim_posted(&mut self, id: BufferId) {
        self.expect_state(id, BufferOwnership::RxPosted);
        self.rx_posted -= 1;
        self.pool.release(id);
    }
}
