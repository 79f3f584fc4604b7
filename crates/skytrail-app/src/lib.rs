//! skytrail replay application.
//!
//! Feeds a recorded waypoint track through the traffic engine the way a
//! live tracking feed would, from a worker thread, and writes the rendered
//! traffic snapshots.

pub mod errors;
pub mod feed_loop;
pub mod replay;
pub mod track;

pub use skytrail_core as core;
