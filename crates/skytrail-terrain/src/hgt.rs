//! SRTM / NASADEM `.hgt` tiles.
//!
//! A tile is a square of big-endian `i16` posts covering one degree, named
//! after its south-west corner (`N47E008.hgt`). Rows run north to south.

use std::io;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::grid::{TerrainGrid, TerrainHeader};

/// Post value marking missing data.
const VOID: i16 = i16::MIN;

/// Posts per side and spacing (arc-seconds) of the known tile resolutions.
const RESOLUTIONS: [(u32, f64); 2] = [(3601, 1.0), (1201, 3.0)];

/// South-west corner `(lat, lon)` encoded in a tile file name.
pub fn tile_origin(filename: &str) -> Option<(f64, f64)> {
    let re = Regex::new(r"(?i)^([ns])(\d{2})([ew])(\d{3})\.hgt$").ok()?;
    let caps = re.captures(filename)?;
    let lat: f64 = caps[2].parse().ok()?;
    let lon: f64 = caps[4].parse().ok()?;
    let lat = if caps[1].eq_ignore_ascii_case("s") { -lat } else { lat };
    let lon = if caps[3].eq_ignore_ascii_case("w") { -lon } else { lon };
    Some((lat, lon))
}

/// Decode a tile body into its posts, side length and spacing.
pub fn decode_tile(data: &[u8]) -> io::Result<(Vec<i16>, u32, f64)> {
    let &(side, spacing) = RESOLUTIONS
        .iter()
        .find(|(side, _)| (*side as usize).pow(2) * 2 == data.len())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} bytes is neither a 1\" nor a 3\" tile", data.len()),
            )
        })?;
    let posts = data
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Ok((posts, side, spacing))
}

/// Replace void posts with the mean of their valid direct neighbours,
/// sweeping until every hole is closed from its rim. Posts that never gain
/// a valid neighbour become sea level. Returns the number of voids.
pub fn fill_voids(posts: &mut [i16], cols: usize) -> usize {
    if cols == 0 {
        return 0;
    }
    let rows = posts.len() / cols;
    let mut holes: Vec<usize> = (0..posts.len()).filter(|&i| posts[i] == VOID).collect();
    let voids = holes.len();

    while !holes.is_empty() {
        let patches: Vec<(usize, Option<i16>)> = holes
            .iter()
            .map(|&i| (i, neighbour_mean(posts, i, cols, rows)))
            .collect();
        holes.clear();
        for (i, mean) in &patches {
            match mean {
                Some(v) => posts[*i] = *v,
                None => holes.push(*i),
            }
        }
        if holes.len() == patches.len() {
            for &i in &holes {
                posts[i] = 0;
            }
            break;
        }
    }
    voids
}

fn neighbour_mean(posts: &[i16], idx: usize, cols: usize, rows: usize) -> Option<i16> {
    let (r, c) = (idx / cols, idx % cols);
    let neighbours = [
        r.checked_sub(1).map(|r| (r, c)),
        (r + 1 < rows).then_some((r + 1, c)),
        c.checked_sub(1).map(|c| (r, c)),
        (c + 1 < cols).then_some((r, c + 1)),
    ];
    let (sum, n) = neighbours
        .into_iter()
        .flatten()
        .map(|(r, c)| posts[r * cols + c])
        .filter(|&v| v != VOID)
        .fold((0i32, 0i32), |(sum, n), v| (sum + i32::from(v), n + 1));
    (n > 0).then(|| (sum / n) as i16)
}

/// Load one tile, closing its voids.
pub fn load_hgt(path: &Path) -> io::Result<TerrainGrid> {
    let name = path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
    let (south_lat, west_lon) = tile_origin(name).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not named like a tile", path.display()),
        )
    })?;

    let (mut posts, side, spacing_arcsec) = decode_tile(&std::fs::read(path)?)?;
    let voids = fill_voids(&mut posts, side as usize);
    if voids > 0 {
        warn!(tile = %name, voids, "tile has void posts");
    }

    let grid = TerrainGrid::new(
        TerrainHeader {
            south_lat,
            west_lon,
            spacing_arcsec,
            cols: side,
            rows: side,
        },
        posts,
    );
    debug!(tile = %name, spacing_arcsec, range = ?grid.elevation_range(), "tile loaded");
    Ok(grid)
}

/// Load every `.hgt` tile in `dir`; other files are ignored.
pub fn load_hgt_dir(dir: &Path) -> io::Result<Vec<TerrainGrid>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    paths.retain(|p| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("hgt"))
    });
    // directory order is unspecified; overlapping tiles resolve by name
    paths.sort();
    paths.iter().map(|p| load_hgt(p)).collect()
}
