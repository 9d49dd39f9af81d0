use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatch;
use crate::error::DispatchError;
use crate::models::driver::Driver;
use crate::models::passenger::Passenger;
use crate::models::result::BookingResult;

/// Lifecycle phases of a booking, in order. `Failed` absorbs cancellation
/// during driver acquisition and any unexpected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Created,
    AcquiringDriver,
    EngagingPassenger,
    Transporting,
    Completed,
    Failed,
}

/// One in-flight job: a passenger from admission to destination.
///
/// The id is unique and monotonically increasing per dispatch instance. The
/// start timestamp is taken the instant the booking is created, so time spent
/// waiting for a driver counts toward the trip duration.
pub struct Booking {
    id: u64,
    passenger: Option<Arc<Passenger>>,
    driver: Option<Arc<Driver>>,
    phase: BookingPhase,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Booking {
    pub(crate) fn new(id: u64, passenger: Option<Arc<Passenger>>) -> Self {
        Self {
            id,
            passenger,
            driver: None,
            phase: BookingPhase::Created,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> BookingPhase {
        self.phase
    }

    fn advance(&mut self, phase: BookingPhase, dispatch: &Dispatch, message: &str) {
        self.phase = phase;
        dispatch.log_event(Some(self), message);
    }

    /// Drives the booking through its full lifecycle: wait for a driver, pick
    /// up, drive to the destination, then return the driver to the pool.
    pub(crate) async fn run(
        mut self,
        dispatch: &Dispatch,
        cancel: &CancellationToken,
    ) -> Result<BookingResult, DispatchError> {
        let Some(passenger) = self.passenger.clone() else {
            return Err(DispatchError::Internal("booking has no passenger".to_string()));
        };

        self.advance(BookingPhase::AcquiringDriver, dispatch, "waiting for a driver");
        let driver = match dispatch.acquire_driver(cancel).await {
            Ok(driver) => driver,
            Err(err) => {
                self.advance(BookingPhase::Failed, dispatch, "driver wait abandoned");
                return Err(err);
            }
        };
        self.driver = Some(driver.clone());

        self.advance(
            BookingPhase::EngagingPassenger,
            dispatch,
            "driver assigned, picking up passenger",
        );
        driver.pick_up_passenger(&passenger).await;

        self.advance(BookingPhase::Transporting, dispatch, "en route to destination");
        driver.drive_to_destination(&passenger).await;

        let completed_at = Utc::now();
        let duration = self.started.elapsed();
        self.advance(BookingPhase::Completed, dispatch, "passenger dropped off");

        if !dispatch.add_driver(driver.clone()) {
            dispatch.log_event(Some(&self), "driver pool full, driver not returned");
        }

        Ok(BookingResult {
            booking_id: self.id,
            passenger,
            driver,
            started_at: self.started_at,
            completed_at,
            duration,
        })
    }
}

impl fmt::Display for Booking {
    /// Renders as `<id>:<driverName>:<passengerName>`, substituting the
    /// literal `null` for a field that is not bound yet.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = self.driver.as_ref().map_or("null", |d| d.name.as_str());
        let passenger = self.passenger.as_ref().map_or("null", |p| p.name.as_str());
        write!(f, "{}:{}:{}", self.id, driver, passenger)
    }
}
