//! Buffer core configuration.
//!
//! The pool size is a const generic on the pool/engine/device types; the
//! remaining knobs are runtime values checked once at bring-up.

use crate::error::{EthError, Result};
use crate::hal::cache::CACHE_LINE;

/// Number of DMA buffers in a default pool.
pub const DEFAULT_POOL_SIZE: usize = 512;

/// Default RX queue capacity.
pub const DEFAULT_RX_CAPACITY: usize = 256;

/// Default cap on concurrently outstanding TX buffers.
pub const DEFAULT_TX_CAPACITY: usize = 128;

/// Default size of each DMA buffer (fits a 1518-byte frame).
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Largest buffer size accepted.
pub const MAX_BUFFER_SIZE: usize = 4096;

/// Largest pool a `u16` buffer id can address.
pub const MAX_POOL_SIZE: usize = u16::MAX as usize + 1;

/// Buffer core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthConfig {
    /// Capacity of each DMA buffer in bytes.
    pub buffer_size: usize,
    /// Physical alignment of each buffer.
    pub buffer_align: usize,
    /// RX queue capacity. Also caps RX buffers posted to hardware.
    pub rx_capacity: usize,
    /// Maximum TX buffers loaned to hardware at once.
    pub tx_capacity: usize,
}

impl Default for EthConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            buffer_align: DEFAULT_BUFFER_SIZE,
            rx_capacity: DEFAULT_RX_CAPACITY,
            tx_capacity: DEFAULT_TX_CAPACITY,
        }
    }
}

impl EthConfig {
    /// Config sized for a small pool: capacities split evenly.
    pub fn for_pool(pool_size: usize) -> Self {
        let half = (pool_size / 2).max(1);
        Self {
            rx_capacity: half,
            tx_capacity: half,
            ..Default::default()
        }
    }

    /// Set buffer size (alignment follows it, never below a cache line).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        // out-of-range sizes are rejected by validate()
        self.buffer_align = size
            .checked_next_power_of_two()
            .map_or(0, |align| align.max(CACHE_LINE));
        self
    }

    /// Set buffer alignment.
    pub fn alignment(mut self, align: usize) -> Self {
        self.buffer_align = align;
        self
    }

    /// Set RX queue capacity.
    pub fn rx_capacity(mut self, cap: usize) -> Self {
        self.rx_capacity = cap;
        self
    }

    /// Set TX window.
    pub fn tx_capacity(mut self, cap: usize) -> Self {
        self.tx_capacity = cap;
        self
    }

    /// Check the config against a pool of `pool_size` buffers.
    pub fn validate(&self, pool_size: usize) -> Result<()> {
        if pool_size == 0 || pool_size > MAX_POOL_SIZE {
            return Err(EthError::InvalidConfig("pool size out of range"));
        }
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(EthError::InvalidConfig("buffer size out of range"));
        }
        if !self.buffer_align.is_power_of_two() {
            return Err(EthError::InvalidConfig("buffer alignment must be a power of two"));
        }
        // Every buffer starts on its own cache line, so invalidating one
        // never discards dirty data belonging to a neighbour.
        if self.buffer_align < CACHE_LINE {
            return Err(EthError::InvalidConfig("buffer alignment below cache line size"));
        }
        if self.rx_capacity == 0 || self.rx_capacity > pool_size {
            return Err(EthError::InvalidConfig("rx capacity must be in 1..=pool size"));
        }
        if self.tx_capacity == 0 || self.tx_capacity > pool_size {
            return Err(EthError::InvalidConfig("tx capacity must be in 1..=pool size"));
        }
        Ok(())
    }
}
