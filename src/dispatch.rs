use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::booking::Booking;
use crate::engine::pool::{DriverPool, MAX_IDLE_DRIVERS};
use crate::engine::region::Region;
use crate::error::DispatchError;
use crate::models::driver::Driver;
use crate::models::passenger::Passenger;
use crate::models::result::BookingResult;

/// The central coordinator. Owns the shared driver pool, the region table and
/// global shutdown control; it is the only place bookings are submitted and
/// the only place drivers are returned.
///
/// The pool is global, not region-scoped: a driver returned by any booking
/// becomes available to every region. No region has a dedicated driver
/// guarantee, so a region below capacity can still wait on an empty pool.
pub struct Dispatch {
    pool: DriverPool,
    regions: DashMap<String, Arc<Region>>,
    awaiting_driver: AtomicUsize,
    next_booking_id: AtomicU64,
    shut_down: AtomicBool,
    shutdown_lock: Mutex<()>,
    log_events: bool,
}

impl Dispatch {
    /// Builds a dispatch with one region per config entry.
    pub fn new(config: Config) -> Arc<Self> {
        let regions = DashMap::new();
        for region in &config.regions {
            regions.insert(
                region.name.clone(),
                Arc::new(Region::new(&region.name, region.max_simultaneous_jobs)),
            );
        }

        Arc::new(Self {
            pool: DriverPool::new(MAX_IDLE_DRIVERS),
            regions,
            awaiting_driver: AtomicUsize::new(0),
            next_booking_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
            shutdown_lock: Mutex::new(()),
            log_events: config.log_events,
        })
    }

    /// Adds an idle driver to the shared pool. Returns false, with no side
    /// effect, when the pool is at its ceiling. Safe to call concurrently
    /// from many completing bookings.
    pub fn add_driver(&self, driver: Arc<Driver>) -> bool {
        self.pool.add(driver)
    }

    /// Non-blocking attempt to take one idle driver.
    pub fn get_driver(&self) -> Option<Arc<Driver>> {
        self.pool.try_take()
    }

    pub(crate) async fn acquire_driver(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Driver>, DispatchError> {
        self.pool.acquire(cancel).await
    }

    /// Number of bookings admitted but not yet resolved, across all regions.
    pub fn bookings_awaiting_driver(&self) -> usize {
        self.awaiting_driver.load(Ordering::Acquire)
    }

    pub fn region(&self, name: &str) -> Option<Arc<Region>> {
        self.regions.get(name).map(|entry| entry.value().clone())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Admits a passenger into the named region and schedules the booking on
    /// its own task, handing back a handle immediately. The caller never
    /// blocks here: when the region is at capacity the booking task itself
    /// waits for a slot to free.
    ///
    /// Rejects without touching any counter when the region is unknown or the
    /// region (or the whole dispatch) has been shut down.
    pub fn book_passenger(
        self: &Arc<Self>,
        passenger: Arc<Passenger>,
        region_name: &str,
    ) -> Result<BookingHandle, DispatchError> {
        let region = self
            .region(region_name)
            .ok_or_else(|| DispatchError::RegionNotFound(region_name.to_string()))?;

        if self.is_shut_down() || region.is_shut_down() {
            self.log_event(None, &format!("booking rejected, region {region_name} is shut down"));
            return Err(DispatchError::RegionShutDown(region_name.to_string()));
        }

        let booking = Booking::new(
            self.next_booking_id.fetch_add(1, Ordering::Relaxed),
            Some(passenger),
        );
        let id = booking.id();

        self.awaiting_driver.fetch_add(1, Ordering::AcqRel);

        let slot_held = region.try_acquire_slot();
        if !slot_held {
            self.log_event(Some(&booking), "region at capacity, waiting for a slot");
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_booking(
            self.clone(),
            region,
            booking,
            slot_held,
            cancel.clone(),
        ));

        Ok(BookingHandle { id, cancel, task })
    }

    /// Stops every region from accepting new bookings. Idempotent; concurrent
    /// calls are serialized so the cascade is atomic. Bookings already
    /// scheduled run to completion or natural failure.
    pub fn shutdown(&self) {
        let _guard = self.shutdown_lock.lock();
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        for entry in self.regions.iter() {
            entry.value().shutdown();
            self.log_event(None, &format!("region {} is shutting down", entry.key()));
        }
    }

    /// Diagnostic sink: emits `"<booking>: <message>"` when event logging is
    /// enabled in the config. An absent booking renders as the literal `null`.
    pub fn log_event(&self, booking: Option<&Booking>, message: &str) {
        if !self.log_events {
            return;
        }
        match booking {
            Some(booking) => info!("{booking}: {message}"),
            None => info!("null: {message}"),
        }
    }
}

/// Handle to a scheduled booking. Resolves to `Some(BookingResult)` on
/// success and `None` on any failure; the cause is only visible in the logs.
pub struct BookingHandle {
    id: u64,
    cancel: CancellationToken,
    task: JoinHandle<Option<BookingResult>>,
}

impl BookingHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Abandons the slot or driver wait. A booking that already holds a
    /// driver is past its cancellation points and finishes the trip normally.
    pub fn abandon(&self) {
        self.cancel.cancel();
    }

    /// Waits for the booking to resolve.
    pub async fn result(self) -> Option<BookingResult> {
        self.task.await.ok().flatten()
    }
}

/// Decrements the admission counters exactly once when the booking resolves,
/// whatever path it takes out of `run_booking` — completion, abandonment,
/// or an unexpected fault unwinding the task.
struct ResolutionGuard {
    dispatch: Arc<Dispatch>,
    region: Arc<Region>,
    slot_held: bool,
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        self.dispatch.awaiting_driver.fetch_sub(1, Ordering::AcqRel);
        if self.slot_held {
            self.region.release_slot();
        }
    }
}

async fn run_booking(
    dispatch: Arc<Dispatch>,
    region: Arc<Region>,
    booking: Booking,
    slot_held: bool,
    cancel: CancellationToken,
) -> Option<BookingResult> {
    let mut guard = ResolutionGuard {
        dispatch: dispatch.clone(),
        region: region.clone(),
        slot_held,
    };

    if !guard.slot_held {
        if region.acquire_slot(&cancel).await.is_err() {
            dispatch.log_event(Some(&booking), "abandoned while waiting for a region slot");
            return None;
        }
        guard.slot_held = true;
    }

    let booking_id = booking.id();
    match booking.run(&dispatch, &cancel).await {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(booking_id, error = %err, "booking failed");
            None
        }
    }
}
