//! Common test utilities: host-memory DMA and a scripted NIC

#![allow(dead_code)]

use std::alloc::{alloc_zeroed, Layout};
use std::collections::VecDeque;
use std::ptr::NonNull;

use morpheus_ethif::hal::DmaError;
use morpheus_ethif::{
    BufferId, CompletionHandler, DmaOps, DmaRegion, EthConfig, EthDevice, EthHardware, HwError,
    RxFragment, RxSlot, TxRequest,
};

/// Cache maintenance call seen by [`HostDma`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Clean { addr: usize, len: usize },
    Invalidate { addr: usize, len: usize },
    CleanInvalidate { addr: usize, len: usize },
}

/// DMA allocator over leaked host memory.
///
/// Bus addresses are identity-mapped to host addresses so the mock NIC can
/// "DMA" straight into buffers.
#[derive(Debug, Default)]
pub struct HostDma {
    pub ops: Vec<CacheOp>,
    pub allocations: usize,
    /// Fail the allocation after this many successes.
    pub fail_after: Option<usize>,
}

impl HostDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::default()
        }
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl DmaOps for HostDma {
    fn alloc(&mut self, size: usize, align: usize) -> Result<DmaRegion, DmaError> {
        if self.fail_after == Some(self.allocations) {
            return Err(DmaError::OutOfMemory);
        }
        let layout = Layout::from_size_align(size, align).map_err(|_| DmaError::BadAlignment)?;
        // Leaked on purpose: buffers live for the whole test.
        let ptr = NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or(DmaError::OutOfMemory)?;
        self.allocations += 1;
        Ok(DmaRegion::new(ptr, ptr.as_ptr() as u64, size))
    }

    fn cache_clean(&mut self, vaddr: NonNull<u8>, len: usize) {
        self.ops.push(CacheOp::Clean { addr: vaddr.as_ptr() as usize, len });
    }

    fn cache_invalidate(&mut self, vaddr: NonNull<u8>, len: usize) {
        self.ops.push(CacheOp::Invalidate { addr: vaddr.as_ptr() as usize, len });
    }

    fn cache_clean_invalidate(&mut self, vaddr: NonNull<u8>, len: usize) {
        self.ops.push(CacheOp::CleanInvalidate { addr: vaddr.as_ptr() as usize, len });
    }
}

/// Completion queued by the mock NIC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Rx(Vec<RxFragment>),
    Tx(BufferId),
}

/// Frame the mock NIC read out of a TX buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub cookie: BufferId,
    pub paddr: u64,
    pub data: Vec<u8>,
}

/// Scripted ethernet MAC.
#[derive(Debug)]
pub struct MockNic {
    pub mac: [u8; 6],
    /// Number of RX descriptors.
    pub rx_ring: usize,
    /// Buffers posted and not yet written, oldest first.
    pub posted: VecDeque<RxSlot>,
    pub sent: Vec<SentFrame>,
    /// Transmitted, completion not yet queued.
    pub in_flight: VecDeque<BufferId>,
    pub pending: VecDeque<Completion>,
    pub reject_tx: Option<HwError>,
    pub reject_post: bool,
}

impl Default for MockNic {
    fn default() -> Self {
        Self {
            mac: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            rx_ring: 256,
            posted: VecDeque::new(),
            sent: Vec::new(),
            in_flight: VecDeque::new(),
            pending: VecDeque::new(),
            reject_tx: None,
            reject_post: false,
        }
    }
}

impl MockNic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rx_ring(rx_ring: usize) -> Self {
        Self {
            rx_ring,
            ..Self::default()
        }
    }

    /// Write `data` into the oldest posted buffer and queue its completion.
    pub fn receive(&mut self, data: &[u8]) -> BufferId {
        let slot = self.posted.pop_front().expect("no rx buffer posted");
        dma_write(&slot, data);
        self.pending.push_back(Completion::Rx(vec![RxFragment {
            cookie: slot.cookie,
            len: data.len(),
        }]));
        slot.cookie
    }

    /// Spread one frame over several posted buffers.
    pub fn receive_split(&mut self, parts: &[&[u8]]) -> Vec<BufferId> {
        let mut frags = Vec::new();
        for part in parts {
            let slot = self.posted.pop_front().expect("no rx buffer posted");
            dma_write(&slot, part);
            frags.push(RxFragment { cookie: slot.cookie, len: part.len() });
        }
        let ids = frags.iter().map(|f| f.cookie).collect();
        self.pending.push_back(Completion::Rx(frags));
        ids
    }

    /// Queue a completion reporting `len` bytes without writing anything.
    pub fn receive_len(&mut self, len: usize) -> BufferId {
        let slot = self.posted.pop_front().expect("no rx buffer posted");
        self.pending.push_back(Completion::Rx(vec![RxFragment { cookie: slot.cookie, len }]));
        slot.cookie
    }

    /// Queue TX completions for the `count` oldest in-flight frames.
    pub fn complete_tx(&mut self, count: usize) {
        for _ in 0..count {
            let id = self.in_flight.pop_front().expect("nothing in flight");
            self.pending.push_back(Completion::Tx(id));
        }
    }

    pub fn complete_all_tx(&mut self) {
        let count = self.in_flight.len();
        self.complete_tx(count);
    }
}

/// Copy `data` into the buffer behind `slot`, as the device would.
pub fn dma_write(slot: &RxSlot, data: &[u8]) {
    assert!(data.len() <= slot.capacity, "mock frame larger than rx buffer");
    // Bus addresses are host addresses under HostDma.
    unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), slot.paddr as *mut u8, data.len()) };
}

impl EthHardware for MockNic {
    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn rx_slots_free(&self) -> usize {
        self.rx_ring.saturating_sub(self.posted.len())
    }

    fn post_rx(&mut self, slot: RxSlot) -> Result<(), HwError> {
        if self.reject_post {
            return Err(HwError::QueueFull);
        }
        self.posted.push_back(slot);
        Ok(())
    }

    fn transmit(&mut self, request: TxRequest) -> Result<(), HwError> {
        if let Some(err) = self.reject_tx {
            return Err(err);
        }
        let data =
            unsafe { std::slice::from_raw_parts(request.paddr as *const u8, request.len) }.to_vec();
        self.sent.push(SentFrame { cookie: request.cookie, paddr: request.paddr, data });
        self.in_flight.push_back(request.cookie);
        Ok(())
    }

    fn poll_completions(&mut self, handler: &mut dyn CompletionHandler) {
        while let Some(completion) = self.pending.pop_front() {
            match completion {
                Completion::Rx(frags) => handler.rx_complete(&frags),
                Completion::Tx(id) => handler.tx_complete(id),
            }
        }
    }
}

pub type TestDevice<const N: usize> = EthDevice<MockNic, HostDma, N>;

/// Device over a default mock NIC with 2048-byte buffers.
pub fn device<const N: usize>(rx_capacity: usize, tx_capacity: usize) -> TestDevice<N> {
    let config = EthConfig::for_pool(N)
        .rx_capacity(rx_capacity)
        .tx_capacity(tx_capacity);
    EthDevice::new(MockNic::new(), HostDma::new(), config).expect("device bring-up")
}

/// Frame of `len` bytes with a recognisable pattern.
pub fn frame(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}
