//! Flight phase classification for skytrail.
//!
//! Holds the per-type flight models and the pure state machine that turns
//! kinematic state into a flight phase plus the surface setpoints that go
//! with entering it.

pub mod errors;
pub mod fsm;
pub mod profiles;

pub use skytrail_core as core;
