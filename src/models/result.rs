use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::driver::Driver;
use crate::models::passenger::Passenger;

/// The immutable outcome of a completed booking. The duration spans the full
/// lifecycle, from the instant the booking was created (including any wait for
/// a driver) to arrival at the destination.
#[derive(Debug, Clone)]
pub struct BookingResult {
    pub booking_id: u64,
    pub passenger: Arc<Passenger>,
    pub driver: Arc<Driver>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
}
