//! Terrain elevation for skytrail.
//!
//! Heightmap loading and the terrain probe used to find the ground
//! below an aircraft.

pub mod grid;
pub mod hgt;
pub mod probe;

// Re-export key types for convenience.
pub use grid::{TerrainGrid, TerrainHeader};
pub use probe::{FlatTerrain, TerrainProbe, TileSet};
