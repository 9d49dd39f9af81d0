use std::env;

use crate::error::DispatchError;

/// One admission partition: a name and the maximum number of bookings it may
/// run at the same time.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    pub name: String,
    pub max_simultaneous_jobs: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub regions: Vec<RegionConfig>,
    pub log_events: bool,
    pub log_level: String,
}

impl Config {
    /// Reads the dispatch config from the environment. `REGIONS` is a comma
    /// separated list of `name:capacity` entries.
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        let raw_regions = env::var("REGIONS").unwrap_or_else(|_| "central:10".to_string());

        Ok(Self {
            regions: parse_regions(&raw_regions)?,
            log_events: parse_or_default("LOG_EVENTS", true)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Knobs for the simulation binary; the library itself never reads these.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub drivers: usize,
    pub passengers: usize,
    pub max_pickup_delay_ms: u64,
    pub max_travel_time_ms: u64,
}

impl SimulationConfig {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            drivers: parse_or_default("DRIVERS", 10)?,
            passengers: parse_or_default("PASSENGERS", 40)?,
            max_pickup_delay_ms: parse_or_default("MAX_PICKUP_DELAY_MS", 200)?,
            max_travel_time_ms: parse_or_default("MAX_TRAVEL_TIME_MS", 1000)?,
        })
    }
}

fn parse_regions(raw: &str) -> Result<Vec<RegionConfig>, DispatchError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, capacity) = entry.split_once(':').ok_or_else(|| {
                DispatchError::InvalidConfig(format!("expected name:capacity, got {entry}"))
            })?;

            let max_simultaneous_jobs: usize = capacity.trim().parse().map_err(|err| {
                DispatchError::InvalidConfig(format!("invalid capacity for {name}: {err}"))
            })?;
            if max_simultaneous_jobs == 0 {
                return Err(DispatchError::InvalidConfig(format!(
                    "region {name} must allow at least one booking"
                )));
            }

            Ok(RegionConfig {
                name: name.trim().to_string(),
                max_simultaneous_jobs,
            })
        })
        .collect()
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::InvalidConfig(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
