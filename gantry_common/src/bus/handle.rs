//! Shared, lock-guarded access to the bus.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::bus::driver::FieldBus;

/// Cloneable handle to the single bus instance of a session.
///
/// Every access, including reads for display and link monitoring, goes
/// through the same mutex as the coordinator's own transactions. Hold the
/// guard for one logical operation only; never across a settle sleep.
#[derive(Clone)]
pub struct BusHandle {
    inner: Arc<Mutex<dyn FieldBus>>,
}

impl BusHandle {
    /// Take ownership of a driver.
    pub fn new<B: FieldBus + 'static>(bus: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bus)),
        }
    }

    /// Wrap a driver the caller keeps a typed reference to (tests inspect
    /// simulated devices this way).
    pub fn from_shared<B: FieldBus + 'static>(shared: Arc<Mutex<B>>) -> Self {
        let inner: Arc<Mutex<dyn FieldBus>> = shared;
        Self { inner }
    }

    /// Lock the bus for one operation.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, dyn FieldBus> {
        self.inner.lock()
    }

    /// Transact under the lock; returns the working counter.
    #[inline]
    pub fn transact(&self) -> u16 {
        self.inner.lock().transact()
    }
}

impl std::fmt::Debug for BusHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusHandle").finish_non_exhaustive()
    }
}
