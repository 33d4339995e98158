//! Hardware driver boundary.
//!
//! The MAC driver itself lives outside this crate; it implements
//! [`EthHardware`] and reports completions through [`CompletionHandler`].

pub mod traits;

pub use traits::{
    CompletionHandler, EthHardware, HwError, NullHardware, RxFragment, RxSlot, TxRequest,
};
