//! Elevation posts on a regular latitude/longitude lattice.
//!
//! Posts sit on the lattice corners, so a tile of `n` posts per side spans
//! `n - 1` spacings and neighbouring tiles share their border posts.

/// Placement of a post lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainHeader {
    /// Latitude of the southernmost post row (degrees).
    pub south_lat: f64,
    /// Longitude of the westernmost post column (degrees).
    pub west_lon: f64,
    /// Distance between posts (arc-seconds).
    pub spacing_arcsec: f64,
    pub cols: u32,
    pub rows: u32,
}

impl TerrainHeader {
    fn spacing_deg(&self) -> f64 {
        self.spacing_arcsec / 3600.0
    }

    pub fn north_lat(&self) -> f64 {
        self.south_lat + f64::from(self.rows.saturating_sub(1)) * self.spacing_deg()
    }

    pub fn east_lon(&self) -> f64 {
        self.west_lon + f64::from(self.cols.saturating_sub(1)) * self.spacing_deg()
    }

    /// Border posts belong to the tile.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south_lat..=self.north_lat()).contains(&lat)
            && (self.west_lon..=self.east_lon()).contains(&lon)
    }
}

/// Heightmap tile, posts stored north row first.
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    pub header: TerrainHeader,
    posts: Vec<i16>,
    range: (i16, i16),
}

impl TerrainGrid {
    pub fn new(header: TerrainHeader, posts: Vec<i16>) -> Self {
        let range = posts
            .iter()
            .fold(None, |acc: Option<(i16, i16)>, &p| match acc {
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
                None => Some((p, p)),
            })
            .unwrap_or((0, 0));
        Self {
            header,
            posts,
            range,
        }
    }

    /// Lowest and highest post (m).
    pub fn elevation_range(&self) -> (i16, i16) {
        self.range
    }

    pub fn post(&self, row: usize, col: usize) -> Option<i16> {
        if col >= self.header.cols as usize {
            return None;
        }
        self.posts.get(row * self.header.cols as usize + col).copied()
    }

    /// Ground elevation (m), interpolated between the four surrounding
    /// posts. `None` outside the tile.
    pub fn elevation_at(&self, lat: f64, lon: f64) -> Option<f64> {
        let h = &self.header;
        if !h.contains(lat, lon) {
            return None;
        }
        if h.rows < 2 || h.cols < 2 {
            return self.post(0, 0).map(f64::from);
        }

        let y = (h.north_lat() - lat) / h.spacing_deg();
        let x = (lon - h.west_lon) / h.spacing_deg();
        // the last row/column interpolates toward itself
        let r0 = (y.floor() as usize).min(h.rows as usize - 2);
        let c0 = (x.floor() as usize).min(h.cols as usize - 2);
        let (fy, fx) = (y - r0 as f64, x - c0 as f64);

        let at = |r: usize, c: usize| self.post(r, c).map(f64::from);
        let north = lerp(at(r0, c0)?, at(r0, c0 + 1)?, fx);
        let south = lerp(at(r0 + 1, c0)?, at(r0 + 1, c0 + 1)?, fx);
        Some(lerp(north, south, fy))
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    t.mul_add(b - a, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 posts one arc-minute apart south-west of Zurich, a 120 m hill
    /// in the middle.
    fn hill() -> TerrainGrid {
        #[rustfmt::skip]
        let posts = vec![
            400, 400, 400,
            400, 520, 400,
            400, 400, 400,
        ];
        TerrainGrid::new(
            TerrainHeader {
                south_lat: 47.0,
                west_lon: 8.0,
                spacing_arcsec: 60.0,
                cols: 3,
                rows: 3,
            },
            posts,
        )
    }

    const STEP: f64 = 1.0 / 60.0;

    #[test]
    fn test_extent_spans_post_spacings() {
        let g = hill();
        assert!((g.header.north_lat() - (47.0 + 2.0 * STEP)).abs() < 1e-12);
        assert!((g.header.east_lon() - (8.0 + 2.0 * STEP)).abs() < 1e-12);
        assert_eq!(g.elevation_range(), (400, 520));
    }

    #[test]
    fn test_posts_are_exact() {
        let g = hill();
        let e = g.elevation_at(47.0 + STEP, 8.0 + STEP).unwrap();
        assert!((e - 520.0).abs() < 1e-9, "hill top {e}");
        let sw = g.elevation_at(47.0, 8.0).unwrap();
        assert!((sw - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolates_between_posts() {
        let g = hill();
        // halfway from the hill top toward the north post
        let e = g.elevation_at(47.0 + 1.5 * STEP, 8.0 + STEP).unwrap();
        assert!((e - 460.0).abs() < 1e-9, "slope {e}");
        // centre of the north-east cell: one hill post out of four
        let e = g.elevation_at(47.0 + 1.5 * STEP, 8.0 + 1.5 * STEP).unwrap();
        assert!((e - 430.0).abs() < 1e-9, "cell centre {e}");
    }

    #[test]
    fn test_border_posts_inside_and_beyond_outside() {
        let g = hill();
        let ne = g.elevation_at(g.header.north_lat(), g.header.east_lon());
        assert_eq!(ne, Some(400.0));
        assert_eq!(g.elevation_at(46.99, 8.01), None);
        assert_eq!(g.elevation_at(47.01, 8.1), None);
        assert_eq!(g.post(0, 3), None);
    }
}
