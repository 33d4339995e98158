//! DMA buffer management module.
//!
//! Provides ownership-tracked DMA buffers and the fixed pool that owns them.

pub mod buffer;
pub mod ownership;
pub mod pool;
pub mod region;

pub use buffer::{BufferId, DmaBuffer};
pub use ownership::BufferOwnership;
pub use pool::BufferPool;
pub use region::DmaRegion;
