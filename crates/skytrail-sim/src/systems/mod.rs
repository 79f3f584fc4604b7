//! ECS systems that operate on the aircraft world each tick.
//!
//! Systems are free functions over `&mut World` (or `&World` for read-only).
//! Per-aircraft state lives in components.

pub mod cleanup;
pub mod snapshot;
pub mod trajectory;
