use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A unit of demand: a named passenger with a fixed trip duration, used
/// verbatim as the transport delay. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub name: String,
    pub travel_time: Duration,
}

impl Passenger {
    pub fn new(name: impl Into<String>, travel_time: Duration) -> Self {
        Self {
            name: name.into(),
            travel_time,
        }
    }
}
