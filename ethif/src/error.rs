//! Ethernet interface error types

use core::fmt;

use dma_pool::DmaError;

pub type Result<T> = core::result::Result<T, EthError>;

/// Recoverable failures of the buffer core.
///
/// Invariant violations (double free, out-of-range ids, illegal ownership
/// transitions) are not represented here: they panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthError {
    /// Free list is empty.
    PoolExhausted,
    /// TX outstanding count is at its cap. Retry after completions.
    TxWindowFull,
    /// RX queue is saturated; the newest frame was dropped.
    RxQueueFull,
    /// Frame does not fit in a single buffer.
    FrameTooLarge {
        /// Requested length.
        len: usize,
        /// Buffer capacity.
        max: usize,
    },
    /// Hardware refused a descriptor (ring full).
    HardwareBusy,
    /// Hardware is not ready to accept requests.
    DeviceNotReady,
    /// Pool bring-up could not allocate buffer `index`.
    DmaAlloc {
        /// Buffer that failed.
        index: usize,
        /// Allocator error.
        source: DmaError,
    },
    /// Configuration rejected at bring-up.
    InvalidConfig(&'static str),
}

impl EthError {
    /// Soft conditions: the caller should retry later rather than give up.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted | Self::TxWindowFull | Self::RxQueueFull | Self::HardwareBusy
        )
    }
}

impl fmt::Display for EthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolExhausted => write!(f, "DMA buffer pool exhausted"),
            Self::TxWindowFull => write!(f, "TX window full"),
            Self::RxQueueFull => write!(f, "RX queue full"),
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame of {} bytes exceeds buffer size {}", len, max)
            }
            Self::HardwareBusy => write!(f, "hardware descriptor ring full"),
            Self::DeviceNotReady => write!(f, "device not ready"),
            Self::DmaAlloc { index, source } => {
                write!(f, "DMA allocation for buffer {} failed: {}", index, source)
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}
