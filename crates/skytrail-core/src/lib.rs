//! Core types and definitions for the skytrail trajectory engine.
//!
//! This crate defines the vocabulary shared across all other crates:
//! waypoints, flight vectors, tick timing, snapshots, events and constants.
//! It has no dependency on any runtime framework.

pub mod aircraft;
pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod errors;
pub mod events;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
