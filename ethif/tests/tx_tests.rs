//! Transmit path tests: TX window, oversize, hardware refusal

mod common;

use common::{frame, CacheOp, HostDma, MockNic};
use morpheus_ethif::{
    BufferEngine, BufferId, BufferOwnership, EthConfig, EthError, EthHardware, HwError,
};

type Engine<const N: usize> = BufferEngine<HostDma, N>;

fn engine<const N: usize>(tx_capacity: usize) -> Engine<N> {
    let config = EthConfig::for_pool(N).tx_capacity(tx_capacity);
    BufferEngine::new(HostDma::new(), &config).expect("engine bring-up")
}

#[test]
fn test_tx_window() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();

    assert_eq!(engine.send(&mut nic, &frame(100, 1)), Ok(100));
    assert_eq!(engine.send(&mut nic, &frame(100, 2)), Ok(100));
    assert_eq!(engine.tx_outstanding(), 2);
    assert_eq!(engine.pool().available(), 2);
    assert!(!engine.can_send());

    assert_eq!(engine.send(&mut nic, &frame(100, 3)), Err(EthError::TxWindowFull));
    assert_eq!(engine.pool().available(), 2);
    assert_eq!(engine.stats().tx_window_full, 1);
    assert_eq!(nic.sent.len(), 2);

    nic.complete_tx(2);
    nic.poll_completions(&mut engine);

    assert_eq!(engine.tx_outstanding(), 0);
    assert_eq!(engine.pool().available(), 4);
    assert_eq!(engine.stats().tx_completed, 2);
    engine.check_invariants();
}

#[test]
fn test_payload_reaches_hardware() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();
    let payload = frame(1514, 0x40);

    engine.send(&mut nic, &payload).unwrap();

    let sent = &nic.sent[0];
    assert_eq!(sent.data, payload);
    assert_eq!(sent.paddr, engine.pool().get(sent.cookie).bus_addr());
    assert_eq!(engine.pool().get(sent.cookie).ownership(), BufferOwnership::TxInFlight);
    assert_eq!(engine.stats().tx_frames, 1);
}

#[test]
fn test_oversize_frame_rejected() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();

    assert_eq!(
        engine.send(&mut nic, &frame(2049, 0)),
        Err(EthError::FrameTooLarge { len: 2049, max: 2048 })
    );
    assert_eq!(engine.pool().available(), 4);
    assert_eq!(engine.tx_outstanding(), 0);
    assert_eq!(engine.stats().tx_oversize, 1);
    assert!(nic.sent.is_empty());

    // exactly one buffer is fine
    assert_eq!(engine.send(&mut nic, &frame(2048, 0)), Ok(2048));
}

#[test]
fn test_pool_exhaustion_is_soft() {
    let mut engine = engine::<4>(4);
    let mut nic = MockNic::new();
    for _ in 0..3 {
        engine.allocate_rx_buffer(2048).unwrap();
    }

    assert_eq!(engine.send(&mut nic, &frame(60, 0)), Ok(60));
    let err = engine.send(&mut nic, &frame(60, 0)).unwrap_err();
    assert_eq!(err, EthError::PoolExhausted);
    assert!(err.is_retryable());
    assert_eq!(engine.tx_outstanding(), 1);
    engine.check_invariants();
}

#[test]
fn test_hardware_refusal_reclaims_buffer() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();

    nic.reject_tx = Some(HwError::QueueFull);
    assert_eq!(engine.send(&mut nic, &frame(60, 0)), Err(EthError::HardwareBusy));
    nic.reject_tx = Some(HwError::DeviceNotReady);
    assert_eq!(engine.send(&mut nic, &frame(60, 0)), Err(EthError::DeviceNotReady));

    assert_eq!(engine.tx_outstanding(), 0);
    assert_eq!(engine.pool().available(), 4);
    assert_eq!(engine.stats().tx_hw_rejected, 2);
    assert_eq!(engine.stats().tx_frames, 0);
    engine.check_invariants();
}

#[test]
fn test_reserve_then_commit() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();

    let id = engine.reserve_tx(64).unwrap();
    assert_eq!(engine.pool().get(id).ownership(), BufferOwnership::TxReserved);
    engine.tx_buffer_mut(id, 64).copy_from_slice(&frame(64, 5));

    assert_eq!(engine.commit_tx(&mut nic, id, 64), Ok(64));
    assert_eq!(nic.sent[0].data, frame(64, 5));
    assert_eq!(nic.sent[0].cookie, id);
}

#[test]
fn test_cancel_tx_returns_buffer() {
    let mut engine = engine::<4>(2);
    let id = engine.reserve_tx(64).unwrap();
    engine.cancel_tx(id);

    assert_eq!(engine.tx_outstanding(), 0);
    assert_eq!(engine.pool().available(), 4);
    engine.check_invariants();
}

#[test]
fn test_cache_cleaned_before_transmit() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();
    engine.dma_mut().clear_ops();

    engine.send(&mut nic, &frame(100, 0)).unwrap();

    let addr = engine.pool().get(nic.sent[0].cookie).cpu_ptr().as_ptr() as usize;
    assert_eq!(engine.dma().ops, [CacheOp::Clean { addr, len: 100 }]);

    nic.complete_all_tx();
    nic.poll_completions(&mut engine);
    assert_eq!(engine.dma().ops.len(), 1, "completion needs no cache work");
}

#[test]
#[should_panic(expected = "expected TxInFlight")]
fn test_duplicate_tx_completion_panics() {
    let mut engine = engine::<4>(2);
    let mut nic = MockNic::new();
    engine.send(&mut nic, &frame(60, 0)).unwrap();
    let id = nic.sent[0].cookie;

    engine.on_tx_complete(id);
    engine.on_tx_complete(id);
}

#[test]
#[should_panic(expected = "out-of-range")]
fn test_tx_completion_out_of_range_panics() {
    let mut engine = engine::<4>(2);
    engine.on_tx_complete(BufferId(40));
}
