//! Entity spawn and lookup helpers for aircraft.

use std::sync::Arc;

use hecs::{Entity, World};

use skytrail_core::components::AircraftKey;

use crate::provider::{FeedHandle, FlightDataProvider};
use crate::synthesizer::TrajectorySynthesizer;

/// Spawn an aircraft entity with its synthesizer and data feed.
pub fn spawn_aircraft(
    world: &mut World,
    key: AircraftKey,
    synth: TrajectorySynthesizer,
    provider: Arc<dyn FlightDataProvider>,
) -> Entity {
    world.spawn((key, synth, FeedHandle(provider)))
}

/// Entity of the aircraft with the given key.
pub fn find_aircraft(world: &World, key: &str) -> Option<Entity> {
    world
        .query::<&AircraftKey>()
        .iter()
        .find(|(_, k)| k.0 == key)
        .map(|(entity, _)| entity)
}

/// Despawn every aircraft, returning their keys sorted.
pub fn despawn_all(world: &mut World) -> Vec<String> {
    let mut keys: Vec<String> = world
        .query_mut::<&AircraftKey>()
        .into_iter()
        .map(|(_, k)| k.0.clone())
        .collect();
    keys.sort();
    world.clear();
    keys
}
