//! Device adapter: the two entry points the cooperative scheduler calls.
//!
//! # Main loop
//! ```text
//! poll(budget):
//!   1. harvest completions   hw -> on_frame_received / on_tx_complete
//!   2. drain(budget)         RX queue -> FrameSink
//!   3. refill                free list -> hw RX slots
//! device_send(payload):
//!   reserve -> copy -> clean -> hw.transmit     (0 = try again)
//! ```

use log::{info, warn};

use crate::config::{EthConfig, DEFAULT_POOL_SIZE};
use crate::dma::BufferId;
use crate::driver::{EthHardware, RxFragment};
use crate::engine::{BufferEngine, RxOutcome};
use crate::error::{EthError, Result};
use crate::hal::DmaOps;
use crate::stats::{EthStats, PoolCensus};

/// Upstream ingestion entry point.
///
/// The frame slice is only valid for the duration of the call: the buffer
/// goes back to the free list as soon as `ingest` returns.
pub trait FrameSink {
    fn ingest(&mut self, frame: &[u8]);
}

impl<F: FnMut(&[u8])> FrameSink for F {
    fn ingest(&mut self, frame: &[u8]) {
        self(frame)
    }
}

/// Device with the default pool size.
pub type DefaultEthDevice<H, A> = EthDevice<H, A, DEFAULT_POOL_SIZE>;

/// One NIC plus the buffer engine feeding it.
pub struct EthDevice<H: EthHardware, A: DmaOps, const N: usize> {
    hw: H,
    engine: BufferEngine<A, N>,
}

impl<H: EthHardware, A: DmaOps, const N: usize> EthDevice<H, A, N> {
    /// Bring up the pool and post the initial RX buffers.
    ///
    /// Fails without side effects on the hardware if the pool cannot be
    /// fully allocated.
    pub fn new(hw: H, dma: A, config: EthConfig) -> Result<Self> {
        let engine = BufferEngine::new(dma, &config)?;
        let mut dev = Self { hw, engine };
        let posted = dev.refill_rx();
        let mac = dev.hw.mac_address();
        info!(
            "[ethif] device up: mac {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}, {} rx buffers posted",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5], posted
        );
        Ok(dev)
    }

    /// Run one scheduling quantum of receive work.
    ///
    /// At most `budget` frames reach `sink`. Returns the unused budget.
    pub fn poll<S: FrameSink + ?Sized>(&mut self, budget: usize, sink: &mut S) -> usize {
        self.harvest();
        let remaining = self.engine.drain(budget, sink);
        self.refill_rx();

        #[cfg(debug_assertions)]
        self.engine.check_invariants();

        remaining
    }

    /// Send a frame, stack-style: bytes accepted, or 0 for "try again".
    pub fn device_send(&mut self, payload: &[u8]) -> usize {
        match self.send(payload) {
            Ok(len) => len,
            Err(EthError::FrameTooLarge { .. }) => 0,
            Err(err) if err.is_retryable() => 0,
            Err(err) => {
                warn!("[ethif] send failed: {}", err);
                0
            }
        }
    }

    /// Send a frame, reporting why it was not accepted.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        self.engine.send(&mut self.hw, payload)
    }

    /// Collect hardware completions into the engine.
    pub fn harvest(&mut self) {
        self.hw.poll_completions(&mut self.engine);
    }

    /// Post free buffers to hardware RX slots.
    ///
    /// Posted plus queued RX buffers never exceed the RX capacity, which
    /// leaves the rest of the pool to TX. Returns the number posted.
    pub fn refill_rx(&mut self) -> usize {
        let mut posted = 0;
        while self.engine.rx_posted() + self.engine.rx_pending() < self.engine.rx_capacity()
            && self.hw.rx_slots_free() > 0
        {
            let slot = match self.engine.allocate_rx_buffer(self.engine.buffer_size()) {
                Ok(slot) => slot,
                Err(_) => break,
            };
            if self.hw.post_rx(slot).is_err() {
                self.engine.cancel_rx(slot.cookie);
                break;
            }
            posted += 1;
        }
        posted
    }

    /// Receive completion entry point, for drivers that push instead of poll.
    pub fn on_frame_received(&mut self, fragments: &[RxFragment]) -> Result<RxOutcome> {
        self.engine.on_frame_received(fragments)
    }

    /// TX completion entry point, for drivers that push instead of poll.
    pub fn on_tx_complete(&mut self, id: BufferId) {
        self.engine.on_tx_complete(id)
    }

    pub fn mac_address(&self) -> [u8; 6] {
        self.hw.mac_address()
    }

    pub fn link_up(&self) -> bool {
        self.hw.link_up()
    }

    pub fn engine(&self) -> &BufferEngine<A, N> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut BufferEngine<A, N> {
        &mut self.engine
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Split borrow for callers that drive the engine against the NIC.
    pub(crate) fn parts_mut(&mut self) -> (&mut H, &mut BufferEngine<A, N>) {
        (&mut self.hw, &mut self.engine)
    }

    pub fn stats(&self) -> &EthStats {
        self.engine.stats()
    }

    pub fn census(&self) -> PoolCensus {
        self.engine.census()
    }
}
