mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{point, route, Crossings, Rig};
use waymark::kernel::crossing::{CrossingState, TrackCrossing, TrackCrossingObserver};
use waymark::kernel::trigger::{LocationReachedObserver, LocationReachedTrigger};
use waymark::route::InMemoryTelemetryStorage;
use waymark::TrackerError;

const ROUTE: [(f64, f64); 4] = [(1.0, 1.0), (3.0, 3.0), (0.0, 5.0), (3.0, 7.0)];

struct Fixture {
    rig: Rig,
    trigger: Arc<LocationReachedTrigger>,
    crossing: Arc<TrackCrossing>,
    crossings: Arc<Crossings>,
}

fn fixture() -> Fixture {
    let rig = Rig::new();
    let trigger = LocationReachedTrigger::new(
        rig.scheduler.clone(),
        rig.location.clone(),
        Duration::from_secs(10),
        Duration::from_secs(30),
        15.0,
    )
    .unwrap();
    let crossing = TrackCrossing::new(trigger.clone(), rig.clock.clone());
    let crossings = Crossings::new();
    let observer: Arc<dyn TrackCrossingObserver> = crossings.clone();
    crossing.attach_observer(&observer);
    Fixture {
        rig,
        trigger,
        crossing,
        crossings,
    }
}

fn four_checkpoints() -> Arc<waymark::route::Route> {
    route(&ROUTE, Arc::new(InMemoryTelemetryStorage::new()))
}

#[test]
fn nothing_works_before_a_start() {
    let f = fixture();
    assert_eq!(f.crossing.state(), CrossingState::NotStarted);
    assert!(matches!(f.crossing.advance_checkpoint(), Err(TrackerError::NoActiveRoute)));
    assert!(matches!(f.crossing.get_next_checkpoint(), Err(TrackerError::NoActiveRoute)));
    assert!(matches!(f.crossing.get_last_crossed(), Err(TrackerError::NoSuchCheckpoint)));
    assert!(f.crossing.route().is_none());
}

#[test]
fn start_watches_the_first_checkpoint() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();

    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 0);
    assert!(f.crossing.is_crossing());
    assert!(f.trigger.is_watching(f.crossing.observer_id()));
    assert_eq!(f.trigger.target_of(f.crossing.observer_id()), Some(point(1.0, 1.0)));
    assert!(matches!(f.crossing.get_last_crossed(), Err(TrackerError::NoSuchCheckpoint)));
}

#[test]
fn manual_advance_moves_the_watch() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();

    f.crossing.advance_checkpoint().unwrap();

    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 1);
    assert_eq!(f.trigger.target_of(f.crossing.observer_id()), Some(point(3.0, 3.0)));
    assert_eq!(f.crossings.seen(), vec![0]);
    assert_eq!(f.rig.scheduler.active_count(), 1);
}

#[test]
fn arrival_for_an_already_advanced_checkpoint_is_ignored() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();
    f.crossing.advance_checkpoint().unwrap();

    // Arrival at checkpoint 0 delivered after the manual advance.
    LocationReachedObserver::on_location_reached(&*f.crossing);

    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 1);
    assert_eq!(f.trigger.target_of(f.crossing.observer_id()), Some(point(3.0, 3.0)));
    assert_eq!(f.crossings.seen(), vec![0]);
}

#[test]
fn reaching_a_checkpoint_advances_the_crossing() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();

    f.rig.tick();
    f.rig.location.respond(point(1.0, 1.0));
    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 1);

    f.rig.tick();
    f.rig.location.respond(point(3.0, 3.0));
    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 2);
    assert_eq!(f.crossings.seen(), vec![0, 1]);
}

#[test]
fn partial_times_count_from_the_start() {
    let f = fixture();
    f.rig.clock.set(500);
    f.crossing.start_track(four_checkpoints()).unwrap();

    f.rig.clock.advance(4);
    f.crossing.advance_checkpoint().unwrap();
    assert_eq!(f.crossing.last_partial_time().unwrap(), 4);

    f.rig.clock.advance(90);
    f.crossing.advance_checkpoint().unwrap();

    let last = f.crossing.get_last_crossed().unwrap();
    assert_eq!(last.checkpoint_index(), 1);
    assert_eq!(last.partial_time(), 94);
}

#[test]
fn crossing_the_last_checkpoint_ends_the_route() {
    let f = fixture();
    let route = four_checkpoints();
    f.crossing.start_track(route.clone()).unwrap();
    for _ in 0..route.len() {
        f.crossing.advance_checkpoint().unwrap();
    }

    assert_eq!(f.crossing.state(), CrossingState::Ended);
    assert_eq!(f.crossings.seen(), vec![0, 1, 2, 3]);
    assert!(!f.trigger.is_watching(f.crossing.observer_id()));
    assert_eq!(f.rig.scheduler.active_count(), 0);
    assert!(matches!(f.crossing.get_next_checkpoint(), Err(TrackerError::RouteEnded)));
    assert!(matches!(f.crossing.advance_checkpoint(), Err(TrackerError::RouteEnded)));
    assert_eq!(f.crossing.get_last_crossed().unwrap().checkpoint_index(), 3);
    assert_eq!(f.crossings.seen().len(), 4, "a refused advance notifies nobody");
}

#[test]
fn single_checkpoint_route_ends_on_first_crossing() {
    let f = fixture();
    f.crossing
        .start_track(route(&[(1.0, 1.0)], Arc::new(InMemoryTelemetryStorage::new())))
        .unwrap();

    f.rig.tick();
    f.rig.location.respond(point(1.0, 1.0));

    assert_eq!(f.crossing.state(), CrossingState::Ended);
    assert_eq!(f.crossings.seen(), vec![0]);
}

#[test]
fn restarting_begins_again_at_the_first_checkpoint() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();
    f.crossing.advance_checkpoint().unwrap();
    f.crossing.advance_checkpoint().unwrap();

    f.crossing.start_track(four_checkpoints()).unwrap();

    assert_eq!(f.crossing.get_next_checkpoint().unwrap(), 0);
    assert_eq!(f.trigger.target_of(f.crossing.observer_id()), Some(point(1.0, 1.0)));
    assert_eq!(f.rig.scheduler.active_count(), 1);
}

#[test]
fn abort_drops_the_route_silently() {
    let f = fixture();
    f.crossing.start_track(four_checkpoints()).unwrap();
    f.crossing.advance_checkpoint().unwrap();

    f.crossing.abort();

    assert_eq!(f.crossing.state(), CrossingState::NotStarted);
    assert!(f.crossing.route().is_none());
    assert!(!f.trigger.is_watching(f.crossing.observer_id()));
    assert_eq!(f.rig.scheduler.active_count(), 0);
    assert_eq!(f.crossings.seen(), vec![0]);
}

#[test]
fn detached_and_dropped_observers_are_not_notified() {
    let f = fixture();
    let extra = Crossings::new();
    let observer: Arc<dyn TrackCrossingObserver> = extra.clone();
    f.crossing.attach_observer(&observer);
    // Attaching twice registers once.
    f.crossing.attach_observer(&observer);

    f.crossing.start_track(four_checkpoints()).unwrap();
    f.crossing.advance_checkpoint().unwrap();
    assert_eq!(extra.seen(), vec![0]);

    f.crossing.detach_observer(extra.id());
    f.crossing.advance_checkpoint().unwrap();
    assert_eq!(extra.seen(), vec![0]);

    let transient = Crossings::new();
    let observer: Arc<dyn TrackCrossingObserver> = transient.clone();
    f.crossing.attach_observer(&observer);
    drop(observer);
    drop(transient);
    f.crossing.advance_checkpoint().unwrap();

    assert_eq!(f.crossings.seen(), vec![0, 1, 2]);
}
