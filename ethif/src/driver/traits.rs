//! Driver trait definitions.

use crate::dma::BufferId;

/// Hardware refusal of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// Descriptor ring is full, try again after completions collected.
    QueueFull,
    /// Device not ready.
    DeviceNotReady,
}

/// Receive target handed to hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxSlot {
    /// Completion cookie.
    pub cookie: BufferId,
    /// Device-visible address of the buffer.
    pub paddr: u64,
    /// Bytes the device may write.
    pub capacity: usize,
}

/// One buffer's share of a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFragment {
    /// Cookie from the [`RxSlot`] the data landed in.
    pub cookie: BufferId,
    /// Bytes written.
    pub len: usize,
}

/// Transmit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRequest {
    /// Device-visible address of the payload.
    pub paddr: u64,
    /// Payload length.
    pub len: usize,
    /// Returned unchanged in the TX completion.
    pub cookie: BufferId,
}

/// Receiver of hardware completion notifications.
///
/// Invoked synchronously from [`EthHardware::poll_completions`], on the
/// same thread of control as `poll`/`send`.
pub trait CompletionHandler {
    /// A frame landed. More than one fragment means the frame was split
    /// across buffers.
    fn rx_complete(&mut self, fragments: &[RxFragment]);

    /// Hardware finished reading a TX buffer.
    fn tx_complete(&mut self, cookie: BufferId);
}

/// Ethernet MAC driver interface.
///
/// # Contract
/// - every method MUST return immediately (no completion wait)
/// - a cookie is reported back exactly once, through one completion
pub trait EthHardware {
    /// Get MAC address.
    fn mac_address(&self) -> [u8; 6];

    /// Number of RX descriptors that can take a buffer right now.
    fn rx_slots_free(&self) -> usize;

    /// Give the device a buffer to receive into.
    fn post_rx(&mut self, slot: RxSlot) -> Result<(), HwError>;

    /// Queue a frame for transmission (fire-and-forget).
    fn transmit(&mut self, request: TxRequest) -> Result<(), HwError>;

    /// Report finished RX/TX descriptors to `handler`.
    fn poll_completions(&mut self, handler: &mut dyn CompletionHandler);

    /// Get link status.
    fn link_up(&self) -> bool {
        true
    }
}

/// Placeholder NIC that does nothing. Useful for early bring-up.
pub struct NullHardware;

impl EthHardware for NullHardware {
    fn mac_address(&self) -> [u8; 6] {
        [0u8; 6]
    }

    fn rx_slots_free(&self) -> usize {
        0
    }

    fn post_rx(&mut self, _slot: RxSlot) -> Result<(), HwError> {
        Err(HwError::DeviceNotReady)
    }

    fn transmit(&mut self, _request: TxRequest) -> Result<(), HwError> {
        Err(HwError::DeviceNotReady)
    }

    fn poll_completions(&mut self, _handler: &mut dyn CompletionHandler) {}

    fn link_up(&self) -> bool {
        false
    }
}
