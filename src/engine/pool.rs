use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::models::driver::Driver;

/// Hard ceiling on how many idle drivers a dispatch instance will hold.
pub const MAX_IDLE_DRIVERS: usize = 999;

/// Multi-producer/multi-consumer queue of idle drivers, shared by every
/// region. Completing bookings push drivers back while other bookings wait
/// for one; waiters park on a wake list instead of polling.
pub struct DriverPool {
    idle: Mutex<VecDeque<Arc<Driver>>>,
    max_idle: usize,
    driver_returned: Notify,
}

impl DriverPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(VecDeque::new()),
            max_idle,
            driver_returned: Notify::new(),
        }
    }

    /// Appends an idle driver and wakes one waiter. Returns false, with no
    /// side effect, when the pool is already at its ceiling.
    pub fn add(&self, driver: Arc<Driver>) -> bool {
        {
            let mut idle = self.idle.lock();
            if idle.len() >= self.max_idle {
                return false;
            }
            idle.push_back(driver);
        }
        self.driver_returned.notify_one();
        true
    }

    /// Atomic pop-or-empty; never blocks.
    pub fn try_take(&self) -> Option<Arc<Driver>> {
        self.idle.lock().pop_front()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Waits until a driver can be taken or the token is cancelled.
    ///
    /// The notified future is registered before the pop attempt so a driver
    /// returned between the two cannot be missed.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Arc<Driver>, DispatchError> {
        loop {
            let returned = self.driver_returned.notified();
            if let Some(driver) = self.try_take() {
                return Ok(driver);
            }
            tokio::select! {
                _ = returned => {}
                _ = cancel.cancelled() => return Err(DispatchError::AcquisitionAbandoned),
            }
        }
    }
}
