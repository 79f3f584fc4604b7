//! Terrain probe: ground elevation below a geographic position.

use std::path::Path;

use tracing::{debug, info};

use crate::grid::TerrainGrid;
use crate::hgt::load_hgt_dir;

/// Answers "how high is the ground here?".
///
/// `None` means the probe has no data for the position. Callers treat
/// that as sea level.
pub trait TerrainProbe: Send + Sync {
    fn elevation_m(&self, lat: f64, lon: f64) -> Option<f64>;
}

/// Same elevation everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    pub elevation_m: f64,
}

impl FlatTerrain {
    pub fn new(elevation_m: f64) -> Self {
        Self { elevation_m }
    }
}

impl TerrainProbe for FlatTerrain {
    fn elevation_m(&self, _lat: f64, _lon: f64) -> Option<f64> {
        Some(self.elevation_m)
    }
}

impl TerrainProbe for TerrainGrid {
    fn elevation_m(&self, lat: f64, lon: f64) -> Option<f64> {
        self.elevation_at(lat, lon)
    }
}

/// A set of heightmap tiles. The first tile covering a position answers.
#[derive(Debug, Clone, Default)]
pub struct TileSet {
    grids: Vec<TerrainGrid>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all HGT tiles found in `dir`.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let grids = load_hgt_dir(dir)?;
        info!(dir = %dir.display(), tiles = grids.len(), "terrain tiles loaded");
        Ok(Self { grids })
    }

    pub fn add(&mut self, grid: TerrainGrid) {
        debug!(
            lat = grid.header.south_lat,
            lon = grid.header.west_lon,
            "terrain tile added"
        );
        self.grids.push(grid);
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }
}

impl TerrainProbe for TileSet {
    fn elevation_m(&self, lat: f64, lon: f64) -> Option<f64> {
        self.grids
            .iter()
            .filter(|g| g.header.contains(lat, lon))
            .find_map(|g| g.elevation_at(lat, lon))
    }
}
