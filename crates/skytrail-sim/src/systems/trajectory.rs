//! Trajectory system: advances every valid aircraft by one tick.
//!
//! Each aircraft is advanced behind its own unwind boundary. A failure or
//! panic marks only that aircraft [`Invalid`]; the tick goes on.

use std::panic::{self, AssertUnwindSafe};

use hecs::{Entity, World};
use tracing::{error, warn};

use skytrail_core::components::{AircraftKey, Invalid};
use skytrail_core::errors::TrajectoryError;
use skytrail_core::events::AircraftEvent;
use skytrail_core::types::TickContext;
use skytrail_terrain::TerrainProbe;

use crate::engine::EngineConfig;
use crate::provider::FeedHandle;
use crate::synthesizer::TrajectorySynthesizer;

pub fn run(
    world: &mut World,
    tick: &TickContext,
    terrain: &dyn TerrainProbe,
    config: &EngineConfig,
    events: &mut Vec<AircraftEvent>,
) {
    let mut failed: Vec<(Entity, String, TrajectoryError)> = Vec::new();

    for (entity, (key, synth, feed, invalid)) in world.query_mut::<(
        &AircraftKey,
        &mut TrajectorySynthesizer,
        &FeedHandle,
        Option<&Invalid>,
    )>() {
        if invalid.is_some() {
            continue;
        }
        let provider = feed.0.as_ref();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            synth.advance(tick, provider, terrain, config, events)
        }));
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => failed.push((entity, key.0.clone(), e)),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(aircraft = %key, panic = %msg, "panic while advancing aircraft");
                failed.push((entity, key.0.clone(), TrajectoryError::Panicked(msg)));
            }
        }
    }

    for (entity, key, err) in failed {
        warn!(aircraft = %key, error = %err, "aircraft invalid, will be removed");
        let reason = err.to_string();
        let _ = world.insert_one(
            entity,
            Invalid {
                reason: reason.clone(),
            },
        );
        events.push(AircraftEvent::Invalidated { key, reason });
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
