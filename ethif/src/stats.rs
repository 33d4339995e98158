//! Per-device counters and pool census.

/// Event counters. Single-threaded, so plain integers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EthStats {
    /// Single-buffer frames queued for the stack.
    pub rx_frames: u64,
    /// Frames handed to the stack.
    pub rx_delivered: u64,
    /// Multi-buffer frames dropped.
    pub rx_split_dropped: u64,
    /// Frames with zero or oversized length dropped.
    pub rx_bad_length: u64,
    /// Frames dropped because the RX queue was full.
    pub rx_queue_full: u64,
    /// Frames submitted to hardware.
    pub tx_frames: u64,
    /// TX completions processed.
    pub tx_completed: u64,
    /// Sends rejected as larger than a buffer.
    pub tx_oversize: u64,
    /// Sends refused because the TX window was full.
    pub tx_window_full: u64,
    /// Sends refused by the hardware ring.
    pub tx_hw_rejected: u64,
    /// Frames the stack produced that had no buffer to go into.
    pub tx_stack_dropped: u64,
    /// Allocations that found the free list empty.
    pub pool_exhausted: u64,
}

/// Increment `counter`; true when this occurrence should be logged.
///
/// Logs the 1st, 2nd, 4th, 8th, ... occurrence so a storm of drops costs
/// O(log n) log lines.
pub(crate) fn bump(counter: &mut u64) -> bool {
    *counter = counter.saturating_add(1);
    counter.is_power_of_two()
}

/// Snapshot of where every buffer is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolCensus {
    /// Pool size.
    pub total: usize,
    /// On the free list.
    pub free: usize,
    /// Posted to hardware for receive.
    pub rx_posted: usize,
    /// Waiting in the RX queue.
    pub rx_queued: usize,
    /// Lent to the stack.
    pub rx_delivering: usize,
    /// Reserved or in flight for transmit.
    pub tx_outstanding: usize,
}

impl PoolCensus {
    /// Every buffer is accounted for exactly once.
    pub fn is_conserved(&self) -> bool {
        self.free + self.rx_posted + self.rx_queued + self.rx_delivering + self.tx_outstanding
            == self.total
    }
}
