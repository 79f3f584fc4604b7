//! ECS components for hecs entities.
//!
//! Components are plain data structs with no methods.
//! Trajectory logic lives in systems, not components.

use serde::{Deserialize, Serialize};

/// Identifies the tracked aircraft, e.g. its ICAO transponder hex id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AircraftKey(pub String);

impl std::fmt::Display for AircraftKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marks an aircraft that can no longer be computed. Removed by the
/// cleanup system at the end of the tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invalid {
    pub reason: String,
}
