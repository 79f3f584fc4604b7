//! Events emitted by the engine while advancing aircraft.

use serde::{Deserialize, Serialize};

use crate::enums::FlightPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AircraftEvent {
    /// A new aircraft entered the engine.
    Spawned { key: String, label: String },
    /// The flight phase changed during this tick.
    PhaseChanged {
        key: String,
        from: FlightPhase,
        to: FlightPhase,
    },
    /// A stop waypoint was invented because live data ran out on the ground.
    SyntheticStop { key: String, ts: f64 },
    /// The aircraft became permanently invalid.
    Invalidated { key: String, reason: String },
    /// The aircraft was removed from the engine.
    Removed { key: String },
}
