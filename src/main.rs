use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing_subscriber::EnvFilter;

use fleet_dispatch::config::{Config, SimulationConfig};
use fleet_dispatch::dispatch::Dispatch;
use fleet_dispatch::error::DispatchError;
use fleet_dispatch::models::driver::Driver;
use fleet_dispatch::models::passenger::Passenger;

#[tokio::main]
async fn main() -> Result<(), DispatchError> {
    let config = Config::from_env()?;
    let sim = SimulationConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    if config.regions.is_empty() {
        return Err(DispatchError::InvalidConfig(
            "at least one region is required".to_string(),
        ));
    }
    let region_names: Vec<String> = config.regions.iter().map(|r| r.name.clone()).collect();

    let dispatch = Dispatch::new(config);

    for i in 1..=sim.drivers {
        let name = format!("D-{i}");
        let driver = Arc::new(Driver::new(
            name.clone(),
            Duration::from_millis(sim.max_pickup_delay_ms),
        ));
        if !dispatch.add_driver(driver) {
            tracing::warn!(driver = %name, "driver pool full, not registered");
        }
    }

    let mut handles = Vec::with_capacity(sim.passengers);
    let mut rejected = 0usize;
    for i in 1..=sim.passengers {
        let travel_ms = rand::rng().random_range(1..=sim.max_travel_time_ms);
        let passenger = Arc::new(Passenger::new(
            format!("P-{i}"),
            Duration::from_millis(travel_ms),
        ));
        let region = &region_names[(i - 1) % region_names.len()];

        match dispatch.book_passenger(passenger, region) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                rejected += 1;
                tracing::warn!(error = %err, "booking rejected");
            }
        }
    }

    tracing::info!(
        submitted = handles.len(),
        rejected,
        awaiting = dispatch.bookings_awaiting_driver(),
        "all passengers submitted"
    );

    let results =
        futures::future::join_all(handles.into_iter().map(|handle| handle.result())).await;

    let completed = results.iter().filter(|result| result.is_some()).count();
    let failed = results.len() - completed;

    for result in results.into_iter().flatten() {
        tracing::info!(
            booking_id = result.booking_id,
            driver = %result.driver.name,
            passenger = %result.passenger.name,
            duration_ms = result.duration.as_millis() as u64,
            "trip completed"
        );
    }

    dispatch.shutdown();

    tracing::info!(
        completed,
        failed,
        awaiting = dispatch.bookings_awaiting_driver(),
        "simulation finished"
    );

    Ok(())
}
