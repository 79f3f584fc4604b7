//! The replay tick loop.
//!
//! Steps simulated time at a fixed rate over the span of a recorded track,
//! spawns aircraft once their flight data has enough waypoints, and writes
//! one JSON snapshot per tick.

use std::io::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use skytrail_core::events::AircraftEvent;
use skytrail_sim::engine::TrafficEngine;
use skytrail_sim::provider::FlightDataProvider;

use crate::errors::Result;
use crate::feed_loop::{FeedRegistry, FeedWorker};
use crate::track::{time_span, TrackRecord};

/// Tick loop settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Ticks per simulated second.
    pub rate_hz: f64,
    /// Wall-clock pacing factor; 0 runs as fast as possible.
    pub speedup: f64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            rate_hz: 30.0,
            speedup: 0.0,
        }
    }
}

/// What a replay produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReplaySummary {
    pub ticks: u64,
    pub spawned: usize,
    pub removed: usize,
    pub synthetic_stops: usize,
}

/// Run `records` through `engine`, writing snapshots as JSON lines to `out`.
pub fn run_replay<W: Write>(
    engine: &mut TrafficEngine,
    records: Vec<TrackRecord>,
    options: &ReplayOptions,
    out: &mut W,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let Some((start, end)) = time_span(&records) else {
        info!("empty track, nothing to replay");
        return Ok(summary);
    };

    let rate = options.rate_hz.max(1.0);
    let dt = 1.0 / rate;
    let tick_duration = (options.speedup > 0.0).then(|| Duration::from_secs_f64(dt / options.speedup));

    let registry = FeedRegistry::default();
    let worker = FeedWorker::spawn(records, registry.clone())?;
    info!(start, end, rate, "replay started");

    let mut next_tick_time = Instant::now();
    loop {
        let elapsed = summary.ticks as f64 * dt;
        let sim_time = start + elapsed;
        if sim_time > end {
            break;
        }

        // 1. Catch the feed up to now
        worker.release_until(sim_time)?;

        // 2. Create aircraft whose flight data became usable
        spawn_ready(engine, &registry)?;

        // 3. Advance and emit
        let snapshot = engine.tick(sim_time, elapsed);
        serde_json::to_writer(&mut *out, &snapshot)?;
        writeln!(out)?;

        for event in engine.take_events() {
            match event {
                AircraftEvent::Spawned { .. } => summary.spawned += 1,
                AircraftEvent::Removed { .. } => summary.removed += 1,
                AircraftEvent::SyntheticStop { .. } => summary.synthetic_stops += 1,
                _ => {}
            }
        }
        summary.ticks += 1;

        // 4. Sleep until next tick when pacing to wall-clock time
        if let Some(tick_duration) = tick_duration {
            next_tick_time += tick_duration;
            let now = Instant::now();
            if next_tick_time > now {
                std::thread::sleep(next_tick_time - now);
            } else if now - next_tick_time > tick_duration * 2 {
                // Too far behind; reset to avoid catch-up spiral
                next_tick_time = now;
            }
        }
    }

    out.flush()?;
    info!(
        ticks = summary.ticks,
        spawned = summary.spawned,
        removed = summary.removed,
        "replay finished"
    );
    Ok(summary)
}

fn spawn_ready(engine: &mut TrafficEngine, registry: &FeedRegistry) -> Result<()> {
    let feeds = registry.lock()?;
    for (key, fd) in feeds.iter() {
        if engine.contains(key) || !fd.ready_for_aircraft()? {
            continue;
        }
        let static_data = fd.try_copy_static().ready().unwrap_or_default();
        debug!(aircraft = %key, queued = fd.queued()?, "flight data ready");
        engine.add_aircraft(key.clone(), &static_data, fd.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skytrail_core::enums::FlightPhase;
    use skytrail_core::state::TrafficSnapshot;
    use skytrail_core::types::Waypoint;
    use skytrail_phase::profiles::FlightModelTable;
    use skytrail_sim::engine::EngineConfig;
    use skytrail_terrain::FlatTerrain;

    fn report(key: &str, received_at: f64, lon: f64, ts: f64) -> TrackRecord {
        TrackRecord {
            key: key.into(),
            received_at,
            waypoint: Waypoint::new(0.0, lon, 3000.0, ts).with_heading(90.0),
            static_data: None,
            rotate_ts: None,
        }
    }

    fn engine() -> TrafficEngine {
        TrafficEngine::new(
            EngineConfig::default(),
            FlightModelTable::default(),
            Box::new(FlatTerrain::new(0.0)),
        )
    }

    #[test]
    fn test_replay_writes_one_line_per_tick() {
        let records = vec![
            report("abc123", 0.0, 0.0, 0.0),
            report("abc123", 0.0, 0.01, 10.0),
            report("abc123", 5.0, 0.02, 20.0),
        ];
        let mut out = Vec::new();
        let summary = run_replay(
            &mut engine(),
            records,
            &ReplayOptions {
                rate_hz: 2.0,
                speedup: 0.0,
            },
            &mut out,
        )
        .unwrap();

        // 0.0 ..= 20.0 in half seconds
        assert_eq!(summary.ticks, 41);
        assert_eq!(summary.spawned, 1);

        let text = String::from_utf8(out).unwrap();
        let snaps: Vec<TrafficSnapshot> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(snaps.len(), 41);

        let last = &snaps[40];
        assert_eq!(last.aircraft.len(), 1);
        assert_eq!(last.aircraft[0].phase, FlightPhase::Cruise);
        assert!((last.aircraft[0].position.lon - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_aircraft_waits_for_second_report() {
        let records = vec![
            report("late01", 0.0, 0.0, 0.0),
            report("late01", 4.0, 0.01, 10.0),
        ];
        let mut out = Vec::new();
        run_replay(&mut engine(), records, &ReplayOptions { rate_hz: 1.0, speedup: 0.0 }, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let counts: Vec<usize> = text
            .lines()
            .map(|line| serde_json::from_str::<TrafficSnapshot>(line).unwrap().aircraft.len())
            .collect();
        assert_eq!(&counts[..5], &[0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_empty_track() {
        let mut out = Vec::new();
        let summary = run_replay(&mut engine(), Vec::new(), &ReplayOptions::default(), &mut out).unwrap();
        assert_eq!(summary, ReplaySummary::default());
        assert!(out.is_empty());
    }
}
