use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::passenger::Passenger;

/// A unit of service capacity. Idle drivers sit in the dispatch pool; the
/// booking that pops one holds it exclusively until the trip finishes and the
/// driver is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub name: String,
    pub max_pickup_delay: Duration,
}

impl Driver {
    pub fn new(name: impl Into<String>, max_pickup_delay: Duration) -> Self {
        Self {
            name: name.into(),
            max_pickup_delay,
        }
    }

    /// Collects the passenger, suspending for a uniformly random duration in
    /// `[0, max_pickup_delay)`. A zero bound means no delay.
    pub async fn pick_up_passenger(&self, _passenger: &Passenger) {
        let bound_ms = self.max_pickup_delay.as_millis() as u64;
        if bound_ms > 0 {
            let delay = rand::rng().random_range(0..bound_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Drives to the destination, suspending for the passenger's travel time.
    pub async fn drive_to_destination(&self, passenger: &Passenger) {
        tokio::time::sleep(passenger.travel_time).await;
    }
}
