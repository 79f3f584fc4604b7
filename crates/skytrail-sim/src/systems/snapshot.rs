//! Snapshot system: queries the ECS world and builds a TrafficSnapshot.
//!
//! This system is read-only; it never modifies the world.

use hecs::World;

use skytrail_core::state::{AircraftView, TrafficSnapshot};
use skytrail_core::types::TickContext;

use crate::synthesizer::TrajectorySynthesizer;

/// Views of all aircraft that have a position, sorted by key.
pub fn build_snapshot(world: &World, tick: &TickContext) -> TrafficSnapshot {
    let mut aircraft: Vec<AircraftView> = world
        .query::<&TrajectorySynthesizer>()
        .iter()
        .filter(|(_, synth)| synth.has_position())
        .map(|(_, synth)| synth.view().clone())
        .collect();
    aircraft.sort_by(|a, b| a.key.cmp(&b.key));

    TrafficSnapshot {
        tick: *tick,
        aircraft,
    }
}
