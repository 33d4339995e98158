//! Buffer engine: pool, RX queue and TX window.
//!
//! Every buffer id is always in exactly one of:
//! - the free list
//! - RX: posted to hardware, queued for the stack, or being delivered
//! - TX: reserved by the driver, or in flight on hardware
//!
//! [`BufferEngine::check_invariants`] verifies that partition against the
//! per-buffer ownership states.

mod rx;
mod tx;

use heapless::Deque;

use crate::config::EthConfig;
use crate::dma::{BufferId, BufferOwnership, BufferPool};
use crate::driver::{CompletionHandler, RxFragment};
use crate::error::Result;
use crate::hal::DmaOps;
use crate::stats::{EthStats, PoolCensus};

/// A received frame waiting for the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxEntry {
    pub id: BufferId,
    /// Payload length, `0 < len <= capacity`.
    pub len: usize,
}

/// Why a receive completion did not produce a queued frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Frame spanned several buffers; reassembly is not supported.
    SplitFrame { buffers: usize },
    /// Reported length was zero or larger than the buffer.
    BadLength { len: usize },
}

/// Result of a receive completion that was not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// Appended to the RX queue.
    Queued,
    /// Buffers reclaimed, frame discarded.
    Dropped(DropReason),
    /// Completion carried no fragments.
    Ignored,
}

/// DMA buffer pool plus the RX queue and TX accounting built on it.
pub struct BufferEngine<A: DmaOps, const N: usize> {
    dma: A,
    pool: BufferPool<N>,
    rx_queue: Deque<RxEntry, N>,
    rx_capacity: usize,
    tx_capacity: usize,
    /// Buffers posted to hardware for receive.
    rx_posted: usize,
    /// Buffers lent to the stack.
    rx_delivering: usize,
    /// Buffers reserved or in flight for transmit.
    tx_outstanding: usize,
    stats: EthStats,
}

impl<A: DmaOps, const N: usize> BufferEngine<A, N> {
    /// Validate `config` and allocate the whole pool from `dma`.
    pub fn new(mut dma: A, config: &EthConfig) -> Result<Self> {
        config.validate(N)?;
        let pool = BufferPool::new(&mut dma, config.buffer_size, config.buffer_align)?;

        Ok(Self {
            dma,
            pool,
            rx_queue: Deque::new(),
            rx_capacity: config.rx_capacity,
            tx_capacity: config.tx_capacity,
            rx_posted: 0,
            rx_delivering: 0,
            tx_outstanding: 0,
            stats: EthStats::default(),
        })
    }

    pub fn pool(&self) -> &BufferPool<N> {
        &self.pool
    }

    pub fn dma(&self) -> &A {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut A {
        &mut self.dma
    }

    pub fn stats(&self) -> &EthStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EthStats::default();
    }

    pub fn buffer_size(&self) -> usize {
        self.pool.buffer_size()
    }

    pub fn rx_capacity(&self) -> usize {
        self.rx_capacity
    }

    pub fn tx_capacity(&self) -> usize {
        self.tx_capacity
    }

    /// Frames waiting in the RX queue.
    pub fn rx_pending(&self) -> usize {
        self.rx_queue.len()
    }

    /// Buffers currently posted to hardware.
    pub fn rx_posted(&self) -> usize {
        self.rx_posted
    }

    /// Buffers on the receive side in any state.
    pub fn rx_outstanding(&self) -> usize {
        self.rx_posted + self.rx_queue.len() + self.rx_delivering
    }

    pub fn tx_outstanding(&self) -> usize {
        self.tx_outstanding
    }

    /// RX queue contents, oldest first.
    pub fn rx_entries(&self) -> impl Iterator<Item = &RxEntry> {
        self.rx_queue.iter()
    }

    /// Counter-based snapshot of the partition.
    pub fn census(&self) -> PoolCensus {
        PoolCensus {
            total: self.pool.total(),
            free: self.pool.available(),
            rx_posted: self.rx_posted,
            rx_queued: self.rx_queue.len(),
            rx_delivering: self.rx_delivering,
            tx_outstanding: self.tx_outstanding,
        }
    }

    /// Verify conservation and uniqueness against per-buffer states.
    ///
    /// # Panics
    /// Any mismatch is a driver bug.
    pub fn check_invariants(&self) {
        let census = self.census();
        assert!(census.is_conserved(), "BUG: pool not conserved: {:?}", census);

        let mut seen = [false; N];
        for id in self.pool.free_ids() {
            assert!(!seen[id.index()], "BUG: {} on free list twice", id);
            seen[id.index()] = true;
            self.expect_state(id, BufferOwnership::Free);
        }
        for entry in self.rx_queue.iter() {
            assert!(!seen[entry.id.index()], "BUG: {} queued while owned elsewhere", entry.id);
            seen[entry.id.index()] = true;
            self.expect_state(entry.id, BufferOwnership::RxQueued);
        }

        let pool = &self.pool;
        assert_eq!(pool.count(BufferOwnership::RxPosted), self.rx_posted, "BUG: rx_posted drift");
        assert_eq!(
            pool.count(BufferOwnership::RxDelivering),
            self.rx_delivering,
            "BUG: rx_delivering drift"
        );
        assert_eq!(
            pool.count(BufferOwnership::TxReserved) + pool.count(BufferOwnership::TxInFlight),
            self.tx_outstanding,
            "BUG: tx_outstanding drift"
        );
    }

    fn expect_state(&self, id: BufferId, state: BufferOwnership) {
        let actual = self.pool.get(id).ownership();
        assert!(actual == state, "BUG: {} expected {:?}, found {:?}", id, state, actual);
    }
}

impl<A: DmaOps, const N: usize> CompletionHandler for BufferEngine<A, N> {
    fn rx_complete(&mut self, fragments: &[RxFragment]) {
        // drops and queue overflow are already counted
        let _ = self.on_frame_received(fragments);
    }

    fn tx_complete(&mut self, cookie: BufferId) {
        self.on_tx_complete(cookie);
    }
}
