//! MorpheusX ethernet interface buffer core
//!
//! Fixed pool of DMA buffers shared between the RX and TX paths of one NIC,
//! consumed by a network stack running on the same thread of control.
//!
//! ```text
//!   EthHardware ──completions──> BufferEngine ──drain(budget)──> FrameSink
//!        ▲                        │  BufferPool (free list)
//!        └──post_rx / transmit────┘  RX queue, TX window
//! ```
//!
//! The [`device::EthDevice`] drives everything from two entry points,
//! `poll(budget)` and `device_send(payload)`. [`stack::DeviceAdapter`]
//! exposes the same device to smoltcp.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod device;
pub mod dma;
pub mod driver;
pub mod engine;
pub mod error;
pub mod hal;
pub mod shared;
pub mod stats;

#[cfg(feature = "smoltcp-device")]
pub mod stack;

pub use config::{EthConfig, DEFAULT_POOL_SIZE};
pub use device::{DefaultEthDevice, EthDevice, FrameSink};
pub use dma::{BufferId, BufferOwnership, BufferPool};
pub use driver::{CompletionHandler, EthHardware, HwError, RxFragment, RxSlot, TxRequest};
pub use engine::{BufferEngine, DropReason, RxEntry, RxOutcome};
pub use error::{EthError, Result};
pub use hal::{DmaOps, DmaRegion, RegionDma};
pub use shared::SharedDevice;
pub use stats::{EthStats, PoolCensus};

#[cfg(feature = "smoltcp-device")]
pub use stack::DeviceAdapter;
