use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use waymark::config::{TrackerConfig, CONFIG_ENV};
use waymark::kernel::crossing::CrossingState;
use waymark::kernel::scheduler::WakeupScheduler;
use waymark::kernel::telemetry::event::{Telemetry, TelemetryEvent};
use waymark::kernel::telemetry::metrics::summarize;
use waymark::kernel::time::SystemClock;
use waymark::kernel::timer::{run_dispatch, TokioTimer};
use waymark::route::{GeoPoint, InMemoryTelemetryStorage, Route};
use waymark::sensors::simulated::{SimulatedHeartRateSource, SimulatedLocationSource};
use waymark::sensors::{PowerLocks, SensorHub};
use waymark::Tracker;

const WALK_STEPS_PER_LEG: usize = 8;
const GIVE_UP_AFTER: Duration = Duration::from_secs(180);

/// Tight cadences so the walk finishes in well under a minute.
fn demo_config() -> TrackerConfig {
    TrackerConfig {
        location_poll_interval_secs: 1,
        location_read_timeout_secs: 2,
        sampling_interval_secs: 3,
        sensor_read_timeout_secs: 2,
        ..TrackerConfig::default()
    }
}

fn loop_around_the_block() -> anyhow::Result<Vec<GeoPoint>> {
    Ok(vec![
        GeoPoint::new(45.0000, 11.0000)?,
        GeoPoint::new(45.0010, 11.0000)?,
        GeoPoint::new(45.0010, 11.0014)?,
        GeoPoint::new(45.0000, 11.0014)?,
    ])
}

fn previous_run() -> Telemetry {
    Telemetry::new(
        [0, 9, 17, 26]
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| TelemetryEvent::CheckpointReached {
                checkpoint_number: i + 1,
                timestamp,
            })
            .collect(),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("installing tracing subscriber")?;

    let config = match std::env::var_os(CONFIG_ENV) {
        Some(_) => TrackerConfig::from_env().context("loading tracker config")?,
        None => demo_config(),
    };
    tracing::info!(?config, "waymark demo booting");

    let runtime = Handle::current();
    let (timer, fired) = TokioTimer::new(runtime.clone());
    let scheduler = Arc::new(WakeupScheduler::new(Arc::new(timer)));
    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(run_dispatch(Arc::clone(&scheduler), fired, shutdown.clone()));

    let waypoints = loop_around_the_block()?;
    let walk = SimulatedLocationSource::path_through(&waypoints, WALK_STEPS_PER_LEG);
    let location = SimulatedLocationSource::new(runtime.clone(), walk, Duration::from_millis(100))?;

    let hub = SensorHub {
        scheduler,
        location: Arc::new(location),
        heart_rate: Arc::new(SimulatedHeartRateSource::new(runtime, 72)),
        power: Arc::new(PowerLocks::new()),
        clock: Arc::new(SystemClock),
    };

    let storage = Arc::new(InMemoryTelemetryStorage::with_telemetries(vec![previous_run()]));
    let route = Arc::new(Route::new("around the block", waypoints, storage.clone())?);
    let tracker = Tracker::new(&hub, &config)?;
    tracker.start_recorded(Arc::clone(&route))?;

    let mut reported = None;
    let mut cadence = tokio::time::interval(Duration::from_millis(250));
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let deadline = tokio::time::Instant::now() + GIVE_UP_AFTER;

    loop {
        cadence.tick().await;
        let ended = tracker.crossing().state() == CrossingState::Ended;

        if let Ok(crossed) = tracker.last_crossed() {
            if reported != Some(crossed.checkpoint_index()) {
                reported = Some(crossed.checkpoint_index());
                match crossed.delta() {
                    Ok(delta) => tracing::info!(
                        checkpoint = crossed.checkpoint_index(),
                        partial_secs = crossed.partial_time(),
                        delta_secs = delta,
                        "split against best run"
                    ),
                    Err(e) => tracing::warn!(checkpoint = crossed.checkpoint_index(), error = %e, "no split"),
                }
            }
        }

        if ended {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            tracker.crossing().abort();
            tracker.telemetry().disable();
            shutdown.cancel();
            anyhow::bail!("walk did not finish within {GIVE_UP_AFTER:?}");
        }
    }

    let summary = summarize(&tracker.telemetry().events());
    tracing::info!(
        duration_secs = summary.duration_secs,
        checkpoints = summary.checkpoints_reached,
        location_samples = summary.location.samples,
        distance_m = summary.location.distance_m,
        heart_rate_samples = summary.heart_rate.samples,
        avg_bpm = summary.heart_rate.avg_bpm,
        stored_runs = storage.len(),
        "walk finished"
    );

    shutdown.cancel();
    dispatcher.await.context("joining wakeup dispatch")?;
    Ok(())
}
