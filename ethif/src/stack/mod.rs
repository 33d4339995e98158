//! smoltcp integration layer.
//!
//! [`DeviceAdapter`] exposes an [`EthDevice`] to smoltcp's `Device` trait
//! without the intermediate copies: RX tokens lend the DMA buffer itself
//! and TX tokens let smoltcp build the frame directly in one.
//!
//! # Usage
//!
//! ```ignore
//! use morpheus_ethif::{DeviceAdapter, EthConfig, EthDevice, RegionDma};
//!
//! let dma = unsafe { RegionDma::new(vaddr, paddr, size)? };
//! let dev = EthDevice::<_, _, 64>::new(nic, dma, EthConfig::for_pool(64))?;
//! let mut adapter = DeviceAdapter::new(dev);
//!
//! let mut iface = Interface::new(config, &mut adapter, now);
//! loop {
//!     iface.poll(now, &mut adapter, &mut sockets);
//! }
//! ```
//!
//! smoltcp may consume the TX token from inside the RX token's closure
//! (replies are built while the request is still borrowed), so no token
//! holds the device borrowed across a call into smoltcp.

use core::cell::RefCell;

use smoltcp::phy::{Device, DeviceCapabilities, Medium, RxToken, TxToken};
use smoltcp::time::Instant;
use smoltcp::wire::EthernetAddress;

use crate::config::MAX_BUFFER_SIZE;
use crate::device::EthDevice;
use crate::driver::EthHardware;
use crate::engine::RxEntry;
use crate::hal::DmaOps;

/// Adapter that exposes an [`EthDevice`] to smoltcp.
pub struct DeviceAdapter<H: EthHardware, A: DmaOps, const N: usize> {
    inner: RefCell<EthDevice<H, A, N>>,
}

impl<H: EthHardware, A: DmaOps, const N: usize> DeviceAdapter<H, A, N> {
    pub fn new(inner: EthDevice<H, A, N>) -> Self {
        Self {
            inner: RefCell::new(inner),
        }
    }

    pub fn into_inner(self) -> EthDevice<H, A, N> {
        self.inner.into_inner()
    }

    /// Run `f` against the wrapped device.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut EthDevice<H, A, N>) -> R) -> R {
        f(self.inner.get_mut())
    }

    /// MAC address in smoltcp's form, for `iface::Config`.
    pub fn ethernet_address(&self) -> EthernetAddress {
        EthernetAddress(self.inner.borrow().mac_address())
    }
}

impl<H: EthHardware, A: DmaOps, const N: usize> Device for DeviceAdapter<H, A, N> {
    type RxToken<'a> = AdapterRxToken<'a, H, A, N> where Self: 'a;
    type TxToken<'a> = AdapterTxToken<'a, H, A, N> where Self: 'a;

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.max_transmission_unit = self.inner.borrow().engine().buffer_size();
        caps.medium = Medium::Ethernet;
        caps
    }

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let dev = self.inner.get_mut();
        dev.harvest();
        dev.refill_rx();

        // Only return tokens if a frame is ready
        let entry = dev.engine_mut().begin_delivery()?;
        Some((
            AdapterRxToken {
                device: &self.inner,
                entry: Some(entry),
            },
            AdapterTxToken { device: &self.inner },
        ))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        let dev = self.inner.get_mut();
        dev.harvest();
        if dev.engine().can_send() {
            Some(AdapterTxToken { device: &self.inner })
        } else {
            None
        }
    }
}

/// Lends one received frame to smoltcp.
///
/// The buffer goes back to the free list when the token is consumed or
/// dropped.
pub struct AdapterRxToken<'a, H: EthHardware, A: DmaOps, const N: usize> {
    device: &'a RefCell<EthDevice<H, A, N>>,
    entry: Option<RxEntry>,
}

impl<'a, H: EthHardware, A: DmaOps, const N: usize> RxToken for AdapterRxToken<'a, H, A, N> {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let Some(entry) = self.entry.take() else {
            return f(&mut []);
        };
        let ptr = self.device.borrow().engine().pool().get(entry.id).cpu_ptr();
        // SAFETY: the buffer is in RxDelivering: off the free list, not
        // posted to hardware, and owned by this token until finish_delivery.
        let frame = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), entry.len) };
        let result = f(frame);
        self.device.borrow_mut().engine_mut().finish_delivery(entry);
        result
    }
}

impl<'a, H: EthHardware, A: DmaOps, const N: usize> Drop for AdapterRxToken<'a, H, A, N> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.device.borrow_mut().engine_mut().finish_delivery(entry);
        }
    }
}

/// Lets smoltcp build one frame directly in a DMA buffer.
pub struct AdapterTxToken<'a, H: EthHardware, A: DmaOps, const N: usize> {
    device: &'a RefCell<EthDevice<H, A, N>>,
}

impl<'a, H: EthHardware, A: DmaOps, const N: usize> TxToken for AdapterTxToken<'a, H, A, N> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let reserved = self.device.borrow_mut().engine_mut().reserve_tx(len);
        let id = match reserved {
            Ok(id) => id,
            Err(_) => {
                // smoltcp still expects f to run; the frame goes nowhere
                let mut scratch = [0u8; MAX_BUFFER_SIZE];
                let result = f(&mut scratch[..len.min(MAX_BUFFER_SIZE)]);
                self.device.borrow_mut().engine_mut().note_stack_drop();
                return result;
            }
        };

        let ptr = self.device.borrow().engine().pool().get(id).cpu_ptr();
        // SAFETY: the buffer is TxReserved and its capacity was checked
        // against len by reserve_tx.
        let frame = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) };
        let result = f(frame);

        let mut dev = self.device.borrow_mut();
        let (hw, engine) = dev.parts_mut();
        // refusals are already counted and the buffer reclaimed
        let _ = engine.commit_tx(hw, id, len);
        result
    }
}
