//! Buffer ownership state machine.
//!
//! # State Machine
//! ```text
//!            ┌─alloc(rx)─> RX_POSTED ──land──> RX_QUEUED ──pop──> RX_DELIVERING
//!            │                 │ drop                                  │
//!   FREE ◄───┼─────────────────┴───────────────────────────────────────┘
//!     ▲      │
//!     │      └─alloc(tx)─> TX_RESERVED ──submit──> TX_IN_FLIGHT
//!     │                        │ cancel                 │ complete
//!     └────────────────────────┴────────────────────────┘
//! ```
//!
//! INVARIANT: only RX_QUEUED, RX_DELIVERING and TX_RESERVED buffers may be
//! touched by the CPU. Anything else is a driver bug.

/// Who currently owns a pool buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOwnership {
    /// On the free list.
    Free,
    /// Handed to hardware as a receive target.
    RxPosted,
    /// Frame landed; waiting in the RX queue.
    RxQueued,
    /// Lent to the network stack for one ingestion call.
    RxDelivering,
    /// Allocated for transmit; driver is filling it.
    TxReserved,
    /// Handed to hardware for transmit.
    TxInFlight,
}

impl BufferOwnership {
    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    /// Buffer is outstanding on the receive side.
    pub fn is_rx(self) -> bool {
        matches!(self, Self::RxPosted | Self::RxQueued | Self::RxDelivering)
    }

    /// Buffer is outstanding on the transmit side.
    pub fn is_tx(self) -> bool {
        matches!(self, Self::TxReserved | Self::TxInFlight)
    }

    /// CPU may read or write the buffer contents.
    pub fn can_access(self) -> bool {
        matches!(self, Self::RxQueued | Self::RxDelivering | Self::TxReserved)
    }

    /// Hardware may DMA to/from the buffer right now.
    pub fn is_device_owned(self) -> bool {
        matches!(self, Self::RxPosted | Self::TxInFlight)
    }

    /// Whether `self -> next` is a legal edge.
    pub fn can_transition(self, next: Self) -> bool {
        use BufferOwnership::*;
        matches!(
            (self, next),
            (Free, RxPosted)
                | (RxPosted, RxQueued)
                | (RxPosted, Free)
                | (RxQueued, RxDelivering)
                | (RxDelivering, Free)
                | (Free, TxReserved)
                | (TxReserved, TxInFlight)
                | (TxReserved, Free)
                | (TxInFlight, Free)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BufferOwnership::*;

    #[test]
    fn test_rx_lifecycle_edges() {
        assert!(Free.can_transition(RxPosted));
        assert!(RxPosted.can_transition(RxQueued));
        assert!(RxQueued.can_transition(RxDelivering));
        assert!(RxDelivering.can_transition(Free));
        assert!(RxPosted.can_transition(Free));
        assert!(!RxQueued.can_transition(Free));
    }

    #[test]
    fn test_tx_lifecycle_edges() {
        assert!(Free.can_transition(TxReserved));
        assert!(TxReserved.can_transition(TxInFlight));
        assert!(TxInFlight.can_transition(Free));
        assert!(!Free.can_transition(TxInFlight));
        assert!(!Free.can_transition(Free));
        assert!(!TxInFlight.can_transition(RxQueued));
    }

    #[test]
    fn test_roles_partition() {
        for s in [Free, RxPosted, RxQueued, RxDelivering, TxReserved, TxInFlight] {
            let roles = [s.is_free(), s.is_rx(), s.is_tx()];
            assert_eq!(roles.iter().filter(|&&r| r).count(), 1, "{:?}", s);
        }
    }
}
