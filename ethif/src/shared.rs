//! Global slot for the one device a driver task owns.
//!
//! The buffer core is single-threaded by construction; this only gives a
//! `static` home to a device built at runtime, so entry points reached
//! from the scheduler (or an IPC dispatch) can find it.
//!
//! ```ignore
//! static NIC: SharedDevice<EthDevice<MyNic, RegionDma, 256>> = SharedDevice::new();
//!
//! NIC.install(EthDevice::new(nic, dma, config)?).ok();
//! NIC.with(|dev| dev.poll(32, &mut sink));
//! ```

use spin::Mutex;

/// A lazily installed, lock-protected value.
pub struct SharedDevice<T> {
    slot: Mutex<Option<T>>,
}

impl<T> SharedDevice<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Install `device`. Hands it back if one is already installed.
    pub fn install(&self, device: T) -> Result<(), T> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(device);
        }
        *slot = Some(device);
        Ok(())
    }

    /// Run `f` on the installed device, `None` if there is none.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.slot.lock().as_mut().map(f)
    }

    pub fn is_installed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Remove the installed device.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }
}

impl<T> Default for SharedDevice<T> {
    fn default() -> Self {
        Self::new()
    }
}
