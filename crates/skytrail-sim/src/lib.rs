//! Trajectory synthesis for skytrail.
//!
//! Owns the hecs ECS world of tracked aircraft, advances each one once per
//! host tick from its waypoint feed, and produces TrafficSnapshots for the
//! renderer.

pub mod accel;
pub mod engine;
pub mod motion;
pub mod provider;
pub mod surfaces;
pub mod synthesizer;
pub mod systems;
pub mod world_setup;

pub use skytrail_core as core;
pub use engine::{EngineConfig, TrafficEngine};
pub use provider::{FeedHandle, FlightDataProvider, SharedFlightData};
pub use synthesizer::{AdvanceOutcome, TrajectorySynthesizer};
