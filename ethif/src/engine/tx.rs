//! Transmit path.
//!
//! Fire-and-forget transmit - never wait for completion! Buffers come back
//! only through [`BufferEngine::on_tx_complete`].

use log::{debug, warn};

use super::BufferEngine;
use crate::dma::{BufferId, BufferOwnership};
use crate::driver::{EthHardware, HwError, TxRequest};
use crate::error::{EthError, Result};
use crate::hal::DmaOps;
use crate::stats::bump;

impl<A: DmaOps, const N: usize> BufferEngine<A, N> {
    /// Copy `payload` into a DMA buffer and queue it on `hw`.
    ///
    /// Returns `payload.len()` on success. `TxWindowFull`, `PoolExhausted`
    /// and `HardwareBusy` are soft: retry after completions.
    pub fn send<H: EthHardware + ?Sized>(&mut self, hw: &mut H, payload: &[u8]) -> Result<usize> {
        let id = self.reserve_tx(payload.len())?;
        self.pool.get_mut(id).as_mut_slice(payload.len()).copy_from_slice(payload);
        self.commit_tx(hw, id, payload.len())
    }

    /// Whether a send would get past both the window and the pool.
    pub fn can_send(&self) -> bool {
        self.tx_outstanding < self.tx_capacity && !self.pool.is_exhausted()
    }

    /// Claim a TX buffer for a frame of `len` bytes.
    ///
    /// Checks, in order: frame size, TX window, free list. Nothing is
    /// allocated on failure.
    pub fn reserve_tx(&mut self, len: usize) -> Result<BufferId> {
        let max = self.pool.buffer_size();
        if len > max {
            if bump(&mut self.stats.tx_oversize) {
                warn!("[ethif] tx frame of {} bytes too big, max {}", len, max);
            }
            return Err(EthError::FrameTooLarge { len, max });
        }

        if self.tx_outstanding >= self.tx_capacity {
            if bump(&mut self.stats.tx_window_full) {
                debug!("[ethif] tx window full at {} ({} times)", self.tx_capacity, self.stats.tx_window_full);
            }
            return Err(EthError::TxWindowFull);
        }

        let Some(id) = self.pool.allocate(BufferOwnership::TxReserved) else {
            if bump(&mut self.stats.pool_exhausted) {
                debug!("[ethif] out of DMA buffers for tx ({} times)", self.stats.pool_exhausted);
            }
            return Err(EthError::PoolExhausted);
        };
        self.tx_outstanding += 1;
        Ok(id)
    }

    /// Writable view of a reserved TX buffer.
    pub fn tx_buffer_mut(&mut self, id: BufferId, len: usize) -> &mut [u8] {
        self.expect_state(id, BufferOwnership::TxReserved);
        self.pool.get_mut(id).as_mut_slice(len)
    }

    /// Clean the first `len` bytes of a reserved buffer and submit it.
    ///
    /// If the hardware refuses, the buffer is reclaimed and the window
    /// restored before the error is returned.
    pub fn commit_tx<H: EthHardware + ?Sized>(
        &mut self,
        hw: &mut H,
        id: BufferId,
        len: usize,
    ) -> Result<usize> {
        self.expect_state(id, BufferOwnership::TxReserved);
        let buf = self.pool.get(id);
        let (ptr, paddr, capacity) = (buf.cpu_ptr(), buf.bus_addr(), buf.capacity());
        if len > capacity {
            self.cancel_tx(id);
            return Err(EthError::FrameTooLarge { len, max: capacity });
        }

        self.dma.cache_clean(ptr, len);

        // Mark device-owned BEFORE submit
        self.pool.set_ownership(id, BufferOwnership::TxInFlight);

        match hw.transmit(TxRequest { paddr, len, cookie: id }) {
            Ok(()) => {
                self.stats.tx_frames += 1;
                Ok(len)
            }
            Err(err) => {
                // device never saw the descriptor
                self.tx_outstanding -= 1;
                self.pool.release(id);
                if bump(&mut self.stats.tx_hw_rejected) {
                    warn!("[ethif] hardware refused tx of {}: {:?}", id, err);
                }
                Err(match err {
                    HwError::QueueFull => EthError::HardwareBusy,
                    HwError::DeviceNotReady => EthError::DeviceNotReady,
                })
            }
        }
    }

    /// Give back a reserved buffer that will not be sent.
    pub fn cancel_tx(&mut self, id: BufferId) {
        self.expect_state(id, BufferOwnership::TxReserved);
        self.tx_outstanding -= 1;
        self.pool.release(id);
    }

    /// Record a frame the stack built but no buffer could take.
    pub(crate) fn note_stack_drop(&mut self) {
        if bump(&mut self.stats.tx_stack_dropped) {
            debug!("[ethif] stack frame dropped, no tx buffer ({} times)", self.stats.tx_stack_dropped);
        }
    }

    /// Hardware finished with a TX buffer.
    ///
    /// # Panics
    /// A completion for a buffer that is not in flight is a driver bug.
    pub fn on_tx_complete(&mut self, id: BufferId) {
        assert!(id.index() < self.pool.total(), "BUG: tx completion for out-of-range {}", id);
        self.expect_state(id, BufferOwnership::TxInFlight);
        self.tx_outstanding -= 1;
        self.pool.release(id);
        self.stats.tx_completed += 1;
    }
}
