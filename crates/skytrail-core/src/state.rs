//! Per-tick snapshots handed to the renderer.
//!
//! Both snapshots are cached on the aircraft and reused unchanged when a
//! tick cannot recompute them.

use serde::{Deserialize, Serialize};

use crate::enums::{FlightPhase, LightPattern};
use crate::types::TickContext;

pub const LIGHT_TAXI: u8 = 1 << 0;
pub const LIGHT_LANDING: u8 = 1 << 1;
pub const LIGHT_BEACON: u8 = 1 << 2;
pub const LIGHT_STROBE: u8 = 1 << 3;
pub const LIGHT_NAV: u8 = 1 << 4;

/// Exterior light switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    pub taxi: bool,
    pub landing: bool,
    pub beacon: bool,
    pub strobe: bool,
    pub nav: bool,
    pub pattern: LightPattern,
    /// Random offset (s) so that flash rhythms of nearby aircraft differ.
    pub time_offset: f64,
}

impl LightState {
    /// Bitmask of the `LIGHT_*` flags that are on.
    pub fn mask(&self) -> u8 {
        let mut m = 0;
        for (on, bit) in [
            (self.taxi, LIGHT_TAXI),
            (self.landing, LIGHT_LANDING),
            (self.beacon, LIGHT_BEACON),
            (self.strobe, LIGHT_STROBE),
            (self.nav, LIGHT_NAV),
        ] {
            if on {
                m |= bit;
            }
        }
        m
    }
}

/// Rendered position and attitude.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub lat: f64,
    pub lon: f64,
    /// Elevation (m); on ground reduced by the current gear deflection.
    pub elevation_m: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub on_ground: bool,
    pub visible: bool,
    /// AI slotting priority, lower is more important.
    pub ai_priority: u8,
}

/// Animated surfaces and lights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfacesSnapshot {
    /// Ratios 0..1.
    pub gear: f64,
    pub flaps: f64,
    pub spoilers: f64,
    pub reversers: f64,
    /// Thrust ratio, negative while reversing.
    pub thrust: f64,
    pub tire_rpm: f64,
    /// Tire rotation angle (degrees).
    pub tire_deg: f64,
    pub prop_rpm: f64,
    /// Propeller or rotor rotation angle (degrees).
    pub prop_deg: f64,
    /// True in the moment the reversers begin to open after touch-down.
    pub touch_down: bool,
    /// `LIGHT_*` bitmask.
    pub lights: u8,
}

/// Everything the renderer needs about one aircraft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftView {
    pub key: String,
    pub label: String,
    /// RGBA label colour of the flight model.
    pub label_color: [f32; 4],
    pub phase: FlightPhase,
    pub speed_kn: f64,
    pub vsi_ft: f64,
    pub squawk: Option<u16>,
    pub position: PositionSnapshot,
    pub surfaces: SurfacesSnapshot,
}

/// Engine output for one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub tick: TickContext,
    pub aircraft: Vec<AircraftView>,
}
