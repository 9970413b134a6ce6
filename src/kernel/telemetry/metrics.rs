use super::event::TelemetryEvent;
use crate::route::GeoPoint;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySummary {
    pub duration_secs: u64,
    pub checkpoints_reached: u64,
    pub location: LocationStats,
    pub heart_rate: HeartRateStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationStats {
    pub samples: u64,
    /// Sum of straight hops between consecutive samples.
    pub distance_m: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeartRateStats {
    pub samples: u64,
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub avg_bpm: f64,
}

/// Aggregates a telemetry log for display.
pub fn summarize(events: &[TelemetryEvent]) -> TelemetrySummary {
    let mut summary = TelemetrySummary::default();
    let mut previous: Option<GeoPoint> = None;
    let mut bpm_total: u64 = 0;

    for event in events {
        summary.duration_secs = summary.duration_secs.max(event.timestamp());
        match event {
            TelemetryEvent::CheckpointReached { .. } => summary.checkpoints_reached += 1,
            TelemetryEvent::LocationSample { point, .. } => {
                summary.location.samples += 1;
                if let Some(prev) = previous {
                    summary.location.distance_m += prev.distance_to(point);
                }
                previous = Some(*point);
            }
            TelemetryEvent::HeartRateSample { bpm, .. } => {
                let stats = &mut summary.heart_rate;
                if stats.samples == 0 {
                    stats.min_bpm = *bpm;
                    stats.max_bpm = *bpm;
                } else {
                    stats.min_bpm = stats.min_bpm.min(*bpm);
                    stats.max_bpm = stats.max_bpm.max(*bpm);
                }
                stats.samples += 1;
                bpm_total += u64::from(*bpm);
            }
        }
    }

    if summary.heart_rate.samples > 0 {
        summary.heart_rate.avg_bpm = bpm_total as f64 / summary.heart_rate.samples as f64;
    }

    summary
}
