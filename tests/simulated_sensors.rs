use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use waymark::kernel::event::ObserverId;
use waymark::route::GeoPoint;
use waymark::sensors::simulated::{SimulatedHeartRateSource, SimulatedLocationSource};
use waymark::sensors::{HeartRateObserver, HeartRateSource, LocationObserver, LocationSource};
use waymark::TrackerError;

#[derive(Default)]
struct Fixes {
    id: ObserverId,
    points: Mutex<Vec<GeoPoint>>,
    pulses: Mutex<Vec<u32>>,
}

impl Fixes {
    fn points(&self) -> Vec<GeoPoint> {
        self.points.lock().unwrap().clone()
    }
}

impl LocationObserver for Fixes {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_location_update(&self, point: GeoPoint) {
        self.points.lock().unwrap().push(point);
    }
}

impl HeartRateObserver for Fixes {
    fn id(&self) -> ObserverId {
        self.id
    }

    fn on_heart_rate_update(&self, bpm: u32) {
        self.pulses.lock().unwrap().push(bpm);
    }
}

fn p(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap()
}

#[test]
fn path_through_lands_on_every_waypoint() {
    let waypoints = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
    let path = SimulatedLocationSource::path_through(&waypoints, 4);

    assert_eq!(path.len(), 9);
    assert_eq!(path[0], waypoints[0]);
    assert_eq!(path[4], waypoints[1]);
    assert_eq!(path[8], waypoints[2]);
}

#[test]
fn empty_walk_is_rejected() {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let result = SimulatedLocationSource::new(runtime.handle().clone(), Vec::new(), Duration::ZERO);
    assert!(matches!(result, Err(TrackerError::InvalidArgument(_))));
}

#[tokio::test(start_paused = true)]
async fn slow_read_gets_the_stale_position() {
    let walk = vec![p(0.0, 0.0), p(0.0, 0.001), p(0.0, 0.002)];
    let source = SimulatedLocationSource::new(Handle::current(), walk, Duration::from_secs(5)).unwrap();
    let fixes = Arc::new(Fixes::default());

    source.get_single_update(fixes.clone(), Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fixes.points(), vec![p(0.0, 0.0)]);

    source.get_single_update(fixes.clone(), Duration::from_secs(10)).unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(fixes.points(), vec![p(0.0, 0.0), p(0.0, 0.001)]);
}

#[tokio::test(start_paused = true)]
async fn walker_stops_at_the_end_of_its_path() {
    let walk = vec![p(0.0, 0.0), p(0.0, 0.001)];
    let source = SimulatedLocationSource::new(Handle::current(), walk, Duration::from_millis(100)).unwrap();
    let fixes = Arc::new(Fixes::default());

    for _ in 0..3 {
        source.get_single_update(fixes.clone(), Duration::from_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(fixes.points(), vec![p(0.0, 0.001); 3]);
}

#[tokio::test(start_paused = true)]
async fn continuous_updates_stop_on_detach() {
    let source = SimulatedLocationSource::new(Handle::current(), vec![p(1.0, 1.0)], Duration::ZERO).unwrap();
    let fixes = Arc::new(Fixes::default());

    source.attach_observer(fixes.clone(), Duration::from_secs(1)).unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let seen = fixes.points().len();
    assert!(seen >= 2, "got {seen} updates");

    source.detach_observer(fixes.id).unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fixes.points().len(), seen);

    assert!(matches!(
        source.detach_observer(fixes.id),
        Err(TrackerError::UnregisteredObserver)
    ));
}

#[tokio::test(start_paused = true)]
async fn zero_timeouts_are_rejected() {
    let source = SimulatedLocationSource::new(Handle::current(), vec![p(1.0, 1.0)], Duration::ZERO).unwrap();
    let strap = SimulatedHeartRateSource::new(Handle::current(), 60);
    let fixes = Arc::new(Fixes::default());

    assert!(source.get_single_update(fixes.clone(), Duration::ZERO).is_err());
    assert!(source.attach_observer(fixes.clone(), Duration::ZERO).is_err());
    assert!(strap.get_single_update(fixes, Duration::ZERO).is_err());
}

#[tokio::test(start_paused = true)]
async fn heart_rate_varies_above_resting() {
    let strap = SimulatedHeartRateSource::new(Handle::current(), 60);
    let fixes = Arc::new(Fixes::default());

    for _ in 0..4 {
        strap.get_single_update(fixes.clone(), Duration::from_secs(5)).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut pulses = fixes.pulses.lock().unwrap().clone();
    pulses.sort_unstable();
    assert_eq!(pulses, vec![60, 67, 74, 81]);
}
