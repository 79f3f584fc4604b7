//! Geographic positions, flight vectors and tick timing.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::FlightPhase;

/// Compare two model values with a small absolute tolerance.
pub fn dequal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Normalize a heading into [0, 360).
pub fn heading_normalize(h: f64) -> f64 {
    let n = h.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if n >= 360.0 {
        0.0
    } else {
        n
    }
}

/// Signed shortest turn from `from` to `to`, in (-180, 180].
pub fn heading_diff(from: f64, to: f64) -> f64 {
    let d = heading_normalize(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Heading halfway along the shortest turn between two headings.
pub fn heading_avg(a: f64, b: f64) -> f64 {
    heading_normalize(a + heading_diff(a, b) / 2.0)
}

/// Flight path angle (degrees) for a ground speed and vertical speed in m/s.
pub fn vsi_to_deg(speed: f64, vsi: f64) -> f64 {
    vsi.atan2(speed).to_degrees()
}

/// Initial great-circle bearing (degrees) from one coordinate to another.
pub fn coord_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dl = (lon2 - lon1).to_radians();
    let y = dl.sin() * p2.cos();
    let x = p1.cos() * p2.sin() - p1.sin() * p2.cos() * dl.cos();
    heading_normalize(y.atan2(x).to_degrees())
}

/// Haversine distance (m) between two coordinates.
pub fn coord_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = p2 - p1;
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    EARTH_D_M * a.sqrt().min(1.0).asin()
}

/// Destination coordinate after travelling `dist` meters on `heading`.
pub fn coord_dest(lat: f64, lon: f64, heading: f64, dist: f64) -> (f64, f64) {
    let delta = dist / (EARTH_D_M / 2.0);
    let theta = heading.to_radians();
    let p1 = lat.to_radians();
    let l1 = lon.to_radians();
    let p2 = (p1.sin() * delta.cos() + p1.cos() * delta.sin() * theta.cos()).asin();
    let l2 = l1
        + (theta.sin() * delta.sin() * p1.cos()).atan2(delta.cos() - p1.sin() * p2.sin());
    let lon2 = (l2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (p2.to_degrees(), lon2)
}

/// A timestamped position sample.
///
/// Altitude is in meters, angles in degrees, `ts` in simulated seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
    pub ts: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub on_ground: bool,
    #[serde(default)]
    pub phase_hint: Option<FlightPhase>,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64, alt_m: f64, ts: f64) -> Self {
        Self {
            lat,
            lon,
            alt_m,
            ts,
            ..Default::default()
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    pub fn grounded(mut self) -> Self {
        self.on_ground = true;
        self
    }

    pub fn alt_ft(&self) -> f64 {
        self.alt_m / M_PER_FT
    }

    pub fn set_alt_ft(&mut self, ft: f64) {
        self.alt_m = ft * M_PER_FT;
    }

    /// Bearing (degrees) toward another waypoint.
    pub fn angle_to(&self, to: &Waypoint) -> f64 {
        coord_angle(self.lat, self.lon, to.lat, to.lon)
    }

    /// Ground distance (m) to another waypoint.
    pub fn dist_to(&self, to: &Waypoint) -> f64 {
        coord_distance(self.lat, self.lon, to.lat, to.lon)
    }

    /// The flight vector from here to `to`.
    pub fn between(&self, to: &Waypoint) -> GeoVector {
        let dt = to.ts - self.ts;
        let dist = self.dist_to(to);
        let (speed, vsi) = if dequal(dt, 0.0) {
            (f64::INFINITY, 0.0)
        } else {
            (dist / dt, (to.alt_m - self.alt_m) / dt)
        };
        GeoVector {
            angle: self.angle_to(to),
            dist,
            vsi,
            speed,
        }
    }

    /// Position reached by flying along `vec` from here; attitude is kept.
    pub fn dest_pos(&self, vec: &GeoVector) -> Waypoint {
        let (lat, lon) = coord_dest(self.lat, self.lon, vec.angle, vec.dist);
        Waypoint {
            lat,
            lon,
            phase_hint: None,
            ..*self
        }
    }

    /// Linear blend of all scalar fields, `f = 0` giving `self`.
    ///
    /// `f` may exceed 1, which extrapolates beyond `to`. Ground flag is
    /// taken from `self`.
    pub fn blend(&self, to: &Waypoint, f: f64) -> Waypoint {
        let mix = |a: f64, b: f64| a * (1.0 - f) + b * f;
        Waypoint {
            lat: mix(self.lat, to.lat),
            lon: mix(self.lon, to.lon),
            alt_m: mix(self.alt_m, to.alt_m),
            ts: mix(self.ts, to.ts),
            heading: mix(self.heading, to.heading),
            pitch: mix(self.pitch, to.pitch),
            roll: mix(self.roll, to.roll),
            on_ground: self.on_ground,
            phase_hint: None,
        }
    }

    /// Physically plausible: finite, coordinates in range, altitude
    /// within the model limits.
    pub fn is_normal(&self) -> bool {
        [self.lat, self.lon, self.alt_m, self.ts]
            .iter()
            .all(|v| v.is_finite())
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
            && (MDL_ALT_MIN..=MDL_ALT_MAX).contains(&self.alt_ft())
    }

    /// Normalize heading into [0, 360).
    pub fn normalize(&mut self) {
        self.heading = heading_normalize(self.heading);
    }
}

/// Flight vector between two waypoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoVector {
    /// Bearing (degrees).
    pub angle: f64,
    /// Ground distance (m).
    pub dist: f64,
    /// Vertical speed (m/s).
    pub vsi: f64,
    /// Ground speed (m/s).
    pub speed: f64,
}

impl GeoVector {
    /// A pure direction/distance vector with no timing.
    pub fn new(angle: f64, dist: f64) -> Self {
        Self {
            angle,
            dist,
            vsi: 0.0,
            speed: 0.0,
        }
    }

    pub fn speed_kn(&self) -> f64 {
        self.speed * KT_PER_M_PER_S
    }

    /// Vertical speed in ft/min.
    pub fn vsi_ft(&self) -> f64 {
        self.vsi / MS_PER_FTM
    }
}

/// The observer's position, used to rank aircraft for AI slotting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewer {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
    /// Track over ground (degrees).
    pub track: f64,
    /// Nose heading (degrees), preferred over the track on the ground.
    #[serde(default)]
    pub heading: f64,
    pub on_ground: bool,
}

/// Per-tick timing shared by every aircraft advanced in that tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickContext {
    /// Tick counter.
    pub cycle: u64,
    /// Simulated time (s).
    pub sim_time: f64,
    /// Real seconds since the engine started.
    pub elapsed: f64,
    /// Simulated seconds since the previous tick.
    pub diff_time: f64,
    pub viewer: Option<Viewer>,
}

impl TickContext {
    /// A context at the given simulated time, cycle zero.
    pub fn at(sim_time: f64) -> Self {
        Self {
            sim_time,
            ..Default::default()
        }
    }

    /// The context of the following tick.
    pub fn next(&self, sim_time: f64, elapsed: f64) -> Self {
        Self {
            cycle: self.cycle + 1,
            sim_time,
            elapsed,
            diff_time: sim_time - self.sim_time,
            viewer: self.viewer,
        }
    }

    /// False when time ran backwards or jumped by more than `max_gap`.
    pub fn is_linear(&self, max_gap: f64) -> bool {
        self.diff_time >= 0.0 && self.diff_time <= max_gap
    }
}
