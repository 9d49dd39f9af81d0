use std::sync::Arc;
use std::time::Duration;

use fleet_dispatch::config::{Config, RegionConfig};
use fleet_dispatch::dispatch::Dispatch;
use fleet_dispatch::error::DispatchError;
use fleet_dispatch::models::driver::Driver;
use fleet_dispatch::models::passenger::Passenger;

fn config(regions: &[(&str, usize)]) -> Config {
    Config {
        regions: regions
            .iter()
            .map(|(name, capacity)| RegionConfig {
                name: name.to_string(),
                max_simultaneous_jobs: *capacity,
            })
            .collect(),
        log_events: false,
        log_level: "info".to_string(),
    }
}

fn driver(name: &str) -> Arc<Driver> {
    Arc::new(Driver::new(name, Duration::ZERO))
}

fn passenger(name: &str, travel_ms: u64) -> Arc<Passenger> {
    Arc::new(Passenger::new(name, Duration::from_millis(travel_ms)))
}

#[tokio::test]
async fn concurrent_booking_ids_are_distinct_and_gap_free() {
    let dispatch = Dispatch::new(config(&[("metro", 64)]));
    for i in 0..64 {
        assert!(dispatch.add_driver(driver(&format!("D-{i}"))));
    }

    let submissions: Vec<_> = (0..64)
        .map(|i| {
            let dispatch = dispatch.clone();
            tokio::spawn(async move {
                let handle = dispatch
                    .book_passenger(passenger(&format!("P-{i}"), 5), "metro")
                    .unwrap();
                let id = handle.id();
                (id, handle.result().await)
            })
        })
        .collect();

    let mut ids = Vec::new();
    for submission in submissions {
        let (id, result) = submission.await.unwrap();
        assert!(result.is_some());
        ids.push(id);
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 64);
    assert_eq!(ids[0], 1);
    assert_eq!(*ids.last().unwrap(), 64);
}

#[tokio::test]
async fn region_active_count_never_exceeds_capacity() {
    let dispatch = Dispatch::new(config(&[("metro", 3)]));
    for i in 0..10 {
        dispatch.add_driver(driver(&format!("D-{i}")));
    }
    let region = dispatch.region("metro").unwrap();

    let sampler = {
        let region = region.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                let active = region.active_bookings();
                assert!(active <= region.capacity(), "active count {active} over capacity");
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    let handles: Vec<_> = (0..10)
        .map(|i| {
            dispatch
                .book_passenger(passenger(&format!("P-{i}"), 20), "metro")
                .unwrap()
        })
        .collect();

    for handle in handles {
        assert!(handle.result().await.is_some());
    }
    sampler.await.unwrap();

    assert_eq!(region.active_bookings(), 0);
}

#[tokio::test]
async fn shutdown_rejects_future_bookings_permanently() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));
    dispatch.add_driver(driver("D-1"));

    dispatch.shutdown();
    dispatch.shutdown();

    let region = dispatch.region("metro").unwrap();
    assert!(!region.can_accept_booking());

    for i in 0..3 {
        let rejection = dispatch.book_passenger(passenger(&format!("P-{i}"), 5), "metro");
        assert!(matches!(rejection, Err(DispatchError::RegionShutDown(_))));
    }
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
}

#[tokio::test]
async fn shutdown_lets_in_flight_bookings_finish() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));
    dispatch.add_driver(driver("D-1"));

    let handle = dispatch.book_passenger(passenger("P-1", 30), "metro").unwrap();
    dispatch.shutdown();

    let result = handle.result().await.unwrap();
    assert_eq!(result.passenger.name, "P-1");
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
}

#[tokio::test]
async fn awaiting_count_returns_to_baseline() {
    let dispatch = Dispatch::new(config(&[("metro", 4)]));
    dispatch.add_driver(driver("D-1"));
    dispatch.add_driver(driver("D-2"));
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);

    let completing = dispatch.book_passenger(passenger("P-1", 10), "metro").unwrap();
    let completing_too = dispatch.book_passenger(passenger("P-2", 10), "metro").unwrap();
    assert_eq!(dispatch.bookings_awaiting_driver(), 2);

    assert!(completing.result().await.is_some());
    assert!(completing_too.result().await.is_some());
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);

    // Drain the pool so the next booking can never get a driver, then
    // abandon it; the failure path must restore the baseline too.
    while dispatch.get_driver().is_some() {}
    let abandoned = dispatch.book_passenger(passenger("P-3", 10), "metro").unwrap();
    assert_eq!(dispatch.bookings_awaiting_driver(), 1);

    abandoned.abandon();
    assert!(abandoned.result().await.is_none());
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
}

#[tokio::test]
async fn duration_covers_the_whole_trip() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));
    dispatch.add_driver(driver("D-1"));

    let handle = dispatch.book_passenger(passenger("P-1", 50), "metro").unwrap();
    let result = handle.result().await.unwrap();

    assert!(result.duration >= Duration::from_millis(50));
    let wall = result
        .completed_at
        .signed_duration_since(result.started_at)
        .num_milliseconds();
    assert!(wall >= 0);
}

#[tokio::test]
async fn capacity_one_region_serializes_bookings() {
    let dispatch = Dispatch::new(config(&[("metro", 1)]));
    dispatch.add_driver(driver("D-1"));

    let first = dispatch.book_passenger(passenger("P-1", 40), "metro").unwrap();
    let second = dispatch.book_passenger(passenger("P-2", 40), "metro").unwrap();

    let first = first.result().await.unwrap();
    let second = second.result().await.unwrap();

    // The second booking cannot start until the first releases its slot and
    // returns the driver, so its duration spans both trips.
    let later = first.duration.max(second.duration);
    assert!(later >= Duration::from_millis(80));
    assert!(first.duration.min(second.duration) >= Duration::from_millis(40));
}

#[tokio::test]
async fn driver_added_later_extends_the_wait() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));

    let handle = dispatch.book_passenger(passenger("P-1", 10), "metro").unwrap();
    assert_eq!(dispatch.bookings_awaiting_driver(), 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(dispatch.add_driver(driver("D-1")));

    let result = handle.result().await.unwrap();
    assert!(result.duration >= Duration::from_millis(60));
}

#[tokio::test]
async fn unknown_region_rejects_immediately() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));

    let rejection = dispatch.book_passenger(passenger("P-1", 5), "atlantis");
    assert!(matches!(rejection, Err(DispatchError::RegionNotFound(_))));
    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
}

#[tokio::test]
async fn abandoned_acquisition_resolves_to_none() {
    let dispatch = Dispatch::new(config(&[("metro", 2)]));
    let region = dispatch.region("metro").unwrap();

    let handle = dispatch.book_passenger(passenger("P-1", 5), "metro").unwrap();
    assert_eq!(dispatch.bookings_awaiting_driver(), 1);
    assert_eq!(region.active_bookings(), 1);

    handle.abandon();
    assert!(handle.result().await.is_none());

    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
    assert_eq!(region.active_bookings(), 0);
}

#[tokio::test]
async fn abandoned_capacity_wait_releases_counters() {
    let dispatch = Dispatch::new(config(&[("metro", 1)]));
    dispatch.add_driver(driver("D-1"));
    let region = dispatch.region("metro").unwrap();

    let running = dispatch.book_passenger(passenger("P-1", 60), "metro").unwrap();
    let waiting = dispatch.book_passenger(passenger("P-2", 5), "metro").unwrap();
    assert_eq!(dispatch.bookings_awaiting_driver(), 2);

    waiting.abandon();
    assert!(waiting.result().await.is_none());
    assert!(running.result().await.is_some());

    assert_eq!(dispatch.bookings_awaiting_driver(), 0);
    assert_eq!(region.active_bookings(), 0);
}

#[tokio::test]
async fn booking_at_capacity_waits_instead_of_rejecting() {
    let dispatch = Dispatch::new(config(&[("metro", 1)]));
    dispatch.add_driver(driver("D-1"));
    dispatch.add_driver(driver("D-2"));

    let first = dispatch.book_passenger(passenger("P-1", 20), "metro").unwrap();
    let second = dispatch.book_passenger(passenger("P-2", 20), "metro").unwrap();

    assert!(first.result().await.is_some());
    assert!(second.result().await.is_some());
}

#[tokio::test]
async fn driver_pool_rejects_past_its_ceiling() {
    use fleet_dispatch::engine::pool::MAX_IDLE_DRIVERS;

    let dispatch = Dispatch::new(config(&[("metro", 1)]));
    for i in 0..MAX_IDLE_DRIVERS {
        assert!(dispatch.add_driver(driver(&format!("D-{i}"))));
    }
    assert!(!dispatch.add_driver(driver("D-overflow")));

    assert!(dispatch.get_driver().is_some());
    assert!(dispatch.add_driver(driver("D-replacement")));
}

#[tokio::test]
async fn drivers_are_shared_across_regions() {
    let dispatch = Dispatch::new(config(&[("north", 2), ("south", 2)]));
    dispatch.add_driver(driver("D-1"));

    let north = dispatch.book_passenger(passenger("P-1", 10), "north").unwrap();
    assert!(north.result().await.is_some());

    // The same driver, returned to the global pool, now serves the other
    // region.
    let south = dispatch.book_passenger(passenger("P-2", 10), "south").unwrap();
    let result = south.result().await.unwrap();
    assert_eq!(result.driver.name, "D-1");
}
