//! Cleanup system: removes aircraft that were marked invalid.

use hecs::{Entity, World};
use tracing::info;

use skytrail_core::components::{AircraftKey, Invalid};
use skytrail_core::events::AircraftEvent;

/// Despawn every invalid aircraft.
/// Uses a pre-allocated buffer to avoid per-tick allocation.
pub fn run(world: &mut World, despawn_buffer: &mut Vec<Entity>, events: &mut Vec<AircraftEvent>) {
    despawn_buffer.clear();

    for (entity, (key, invalid)) in world.query_mut::<(&AircraftKey, &Invalid)>() {
        info!(aircraft = %key, reason = %invalid.reason, "aircraft removed");
        events.push(AircraftEvent::Removed { key: key.0.clone() });
        despawn_buffer.push(entity);
    }

    for entity in despawn_buffer.drain(..) {
        let _ = world.despawn(entity);
    }
}
