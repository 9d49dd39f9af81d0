use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;

/// A capacity-gated admission partition. Each region caps how many bookings
/// may be active inside it at once; drivers themselves come from the shared
/// dispatch pool, so a region below capacity can still wait on an empty pool.
///
/// Bookings are not completed in FIFO order.
pub struct Region {
    name: String,
    capacity: usize,
    active: AtomicUsize,
    shut_down: AtomicBool,
    slot_freed: Notify,
}

impl Region {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            active: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            slot_freed: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_bookings(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// True iff a new booking could start right now.
    pub fn can_accept_booking(&self) -> bool {
        !self.is_shut_down() && self.active.load(Ordering::Acquire) < self.capacity
    }

    /// Atomically claims one booking slot if the region is below capacity.
    pub fn try_acquire_slot(&self) -> bool {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return false;
            }
            match self.active.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Waits until a slot is claimed or the wait is cancelled. Shutdown does
    /// not interrupt the wait: a booking already admitted keeps its place in
    /// line even while the region refuses new work.
    pub async fn acquire_slot(&self, cancel: &CancellationToken) -> Result<(), DispatchError> {
        loop {
            let freed = self.slot_freed.notified();
            if self.try_acquire_slot() {
                return Ok(());
            }
            tokio::select! {
                _ = freed => {}
                _ = cancel.cancelled() => return Err(DispatchError::AcquisitionAbandoned),
            }
        }
    }

    /// Releases one claimed slot and wakes one waiter. Must be called exactly
    /// once per acquired slot or the region leaks capacity permanently.
    pub fn release_slot(&self) {
        let previous = self.active.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "slot released without a matching acquire");
        self.slot_freed.notify_one();
    }

    /// Terminal: the region stops accepting new bookings. Bookings already
    /// admitted run to completion.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}
