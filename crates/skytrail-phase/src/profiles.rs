//! Per-type flight models.
//!
//! A flight model is the set of thresholds and rates that shape how an
//! aircraft type moves: taxi speed, turn times, pitch limits, the heights
//! at which gear and flaps move. Models are read from a TOML file, can
//! inherit from a parent model, and are selected per aircraft type by an
//! ordered list of regular expressions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use skytrail_core::aircraft::AircraftType;
use skytrail_core::enums::LightPattern;

use crate::errors::{FlightModelError, Result};

/// Name of the built-in model used when nothing else matches.
pub const DEFAULT_MODEL_NAME: &str = "default";

/// Accepted range for numeric model values.
const VALUE_RANGE: std::ops::RangeInclusive<f64> = -10_000.0..=60_000.0;

/// Flight model parameters for one class of aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightModel {
    pub name: String,
    /// Time for gear up/down (s).
    pub gear_duration: f64,
    /// Main gear deflection on touch-down (m).
    pub gear_deflection: f64,
    /// Time for full flaps extension (s).
    pub flaps_duration: f64,
    /// Vertical speed below which flight counts as level (ft/min).
    pub vsi_stable: f64,
    /// Rotation time before lift-off (s).
    pub rotate_time: f64,
    /// Assumed final approach vsi when no vector is known (ft/min).
    pub vsi_final: f64,
    /// Assumed initial climb vsi when no vector is known (ft/min).
    pub vsi_init_climb: f64,
    /// Assumed initial climb speed (kn).
    pub speed_init_climb: f64,
    /// Height AGL to lower the gear on approach (ft).
    pub agl_gear_down: f64,
    /// Height AGL to raise the gear after take-off (ft).
    pub agl_gear_up: f64,
    /// Height AGL to start the flare (ft).
    pub agl_flare: f64,
    /// Above this ground speed (kn) the aircraft is rolling, not taxiing.
    pub max_taxi_speed: f64,
    /// Reversers are used down to this speed (kn).
    pub min_reverse_speed: f64,
    /// Seconds for a 360 degree turn on the ground.
    pub taxi_turn_time: f64,
    /// Seconds for a 360 degree turn in flight.
    pub flight_turn_time: f64,
    /// Maximum bank angle (degrees).
    pub roll_max_bank: f64,
    /// Roll rate (degrees/s).
    pub roll_rate: f64,
    /// Flaps retract above this speed when climbing (kn).
    pub flaps_up_speed: f64,
    /// Flaps extend below this speed when descending (kn).
    pub flaps_down_speed: f64,
    /// Level flight above this height AGL counts as cruise (ft).
    pub cruise_height: f64,
    /// Deceleration during roll-out (m/s², negative).
    pub roll_out_decel: f64,
    pub pitch_min: f64,
    /// Vsi (ft/min) at or below which pitch is `pitch_min`.
    pub pitch_min_vsi: f64,
    pub pitch_max: f64,
    /// Vsi (ft/min) at or above which pitch is `pitch_max`.
    pub pitch_max_vsi: f64,
    /// Pitch added while flaps are extended (degrees).
    pub pitch_flap_add: f64,
    /// Pitch during flare (degrees).
    pub pitch_flare: f64,
    /// Pitch rate (degrees/s).
    pub pitch_rate: f64,
    /// Maximum propeller speed (rpm).
    pub prop_rpm_max: f64,
    pub light_pattern: LightPattern,
    /// Landing lights on below this altitude (ft); zero disables the rule.
    pub light_ll_alt: f64,
    /// Label base colour, RGBA.
    pub label_color: [f32; 4],
}

impl Default for FlightModel {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL_NAME.to_string(),
            gear_duration: 10.0,
            gear_deflection: 0.5,
            flaps_duration: 5.0,
            vsi_stable: 100.0,
            rotate_time: 3.0,
            vsi_final: -600.0,
            vsi_init_climb: 1500.0,
            speed_init_climb: 150.0,
            agl_gear_down: 1600.0,
            agl_gear_up: 100.0,
            agl_flare: 25.0,
            max_taxi_speed: 50.0,
            min_reverse_speed: 80.0,
            taxi_turn_time: 45.0,
            flight_turn_time: 120.0,
            roll_max_bank: 30.0,
            roll_rate: 10.0,
            flaps_up_speed: 180.0,
            flaps_down_speed: 200.0,
            cruise_height: 15_000.0,
            roll_out_decel: -2.0,
            pitch_min: -2.0,
            pitch_min_vsi: -1000.0,
            pitch_max: 18.0,
            pitch_max_vsi: 2000.0,
            pitch_flap_add: 4.0,
            pitch_flare: 10.0,
            pitch_rate: 5.0,
            prop_rpm_max: 1200.0,
            light_pattern: LightPattern::Default,
            light_ll_alt: 100_000.0,
            label_color: [1.0, 1.0, 0.0, 1.0],
        }
    }
}

/// One `[[model]]` table of the model file. Every value is optional and
/// overrides the parent's.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct ModelSection {
    #[serde(rename = "name")]
    name: String,
    #[serde(rename = "parent")]
    parent: Option<String>,
    gear_duration: Option<f64>,
    gear_deflection: Option<f64>,
    flaps_duration: Option<f64>,
    vsi_stable: Option<f64>,
    rotate_time: Option<f64>,
    vsi_final: Option<f64>,
    vsi_init_climb: Option<f64>,
    speed_init_climb: Option<f64>,
    agl_gear_down: Option<f64>,
    agl_gear_up: Option<f64>,
    agl_flare: Option<f64>,
    max_taxi_speed: Option<f64>,
    #[serde(rename = "MIN_REVERS_SPEED", alias = "MIN_REVERSE_SPEED")]
    min_reverse_speed: Option<f64>,
    taxi_turn_time: Option<f64>,
    flight_turn_time: Option<f64>,
    roll_max_bank: Option<f64>,
    roll_rate: Option<f64>,
    flaps_up_speed: Option<f64>,
    flaps_down_speed: Option<f64>,
    cruise_height: Option<f64>,
    roll_out_decel: Option<f64>,
    pitch_min: Option<f64>,
    pitch_min_vsi: Option<f64>,
    pitch_max: Option<f64>,
    pitch_max_vsi: Option<f64>,
    pitch_flap_add: Option<f64>,
    pitch_flare: Option<f64>,
    pitch_rate: Option<f64>,
    prop_rpm_max: Option<f64>,
    light_pattern: Option<u8>,
    light_ll_alt: Option<f64>,
    label_color: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
struct MapEntry {
    model: String,
    pattern: String,
}

#[derive(Debug, Default, Deserialize)]
struct ModelFile {
    #[serde(default)]
    model: Vec<ModelSection>,
    #[serde(default)]
    map: Vec<MapEntry>,
}

/// Copy each present, in-range override onto the model.
macro_rules! apply_values {
    ($section:expr, $model:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $section.$field {
                if VALUE_RANGE.contains(&v) {
                    $model.$field = v;
                } else {
                    warn!(
                        model = %$model.name,
                        key = stringify!($field),
                        value = v,
                        "flight model value out of range, ignored"
                    );
                }
            }
        )+
    };
}

impl ModelSection {
    /// Build the model from its parent plus this section's overrides.
    fn resolve(&self, parent: &FlightModel) -> FlightModel {
        let mut m = parent.clone();
        m.name = self.name.clone();

        apply_values!(
            self,
            m,
            gear_duration,
            gear_deflection,
            flaps_duration,
            vsi_stable,
            rotate_time,
            vsi_final,
            vsi_init_climb,
            speed_init_climb,
            agl_gear_down,
            agl_gear_up,
            agl_flare,
            max_taxi_speed,
            min_reverse_speed,
            taxi_turn_time,
            flight_turn_time,
            roll_max_bank,
            roll_rate,
            flaps_up_speed,
            flaps_down_speed,
            cruise_height,
            roll_out_decel,
            pitch_min,
            pitch_min_vsi,
            pitch_max,
            pitch_max_vsi,
            pitch_flap_add,
            pitch_flare,
            pitch_rate,
            prop_rpm_max,
            light_ll_alt,
        );

        // rates divide durations later on
        m.roll_rate = m.roll_rate.max(1.0);
        m.pitch_rate = m.pitch_rate.max(1.0);

        if let Some(idx) = self.light_pattern {
            match LightPattern::from_index(idx) {
                Some(p) => m.light_pattern = p,
                None => warn!(model = %self.name, value = idx, "LIGHT_PATTERN must be 0, 1 or 2"),
            }
        }

        if let Some(ref hex) = self.label_color {
            match parse_color(hex) {
                Some(c) => m.label_color = c,
                None => warn!(model = %self.name, value = %hex, "LABEL_COLOR is not a hex colour"),
            }
        }

        for key in self.unknown.keys() {
            warn!(model = %self.name, key = %key, "unknown flight model key ignored");
        }

        m
    }
}

/// Parse `RRGGBB` or `RRGGBBAA` (optional leading `#`) into RGBA floats.
pub fn parse_color(hex: &str) -> Option<[f32; 4]> {
    let hex = hex.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let mut rgba = [1.0f32; 4];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).ok()?;
        rgba[i] = u8::from_str_radix(s, 16).ok()? as f32 / 255.0;
    }
    Some(rgba)
}

/// All known flight models plus the type-to-model map.
#[derive(Debug, Clone)]
pub struct FlightModelTable {
    default: Arc<FlightModel>,
    models: Vec<Arc<FlightModel>>,
    map: Vec<(Regex, Arc<FlightModel>)>,
}

impl Default for FlightModelTable {
    fn default() -> Self {
        Self {
            default: Arc::new(FlightModel::default()),
            models: Vec::new(),
            map: Vec::new(),
        }
    }
}

impl FlightModelTable {
    /// Read a model file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse model file content.
    ///
    /// Models are resolved in file order, so a parent must appear before
    /// its children. A model named `default` replaces the built-in default.
    /// Map entries with bad patterns or unknown models are skipped.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ModelFile = toml::from_str(text)?;
        let mut table = Self::default();

        for section in &file.model {
            let parent = match section.parent.as_deref() {
                None => table.default.clone(),
                Some(p) => table.by_name(p).ok_or_else(|| FlightModelError::UnknownParent {
                    model: section.name.clone(),
                    parent: p.to_string(),
                })?,
            };
            let model = Arc::new(section.resolve(&parent));
            if model.name == DEFAULT_MODEL_NAME {
                table.default = model.clone();
            }
            if let Some(pos) = table.models.iter().position(|m| m.name == model.name) {
                warn!(model = %model.name, "flight model defined twice, later one wins");
                table.models[pos] = model;
            } else {
                table.models.push(model);
            }
        }

        for entry in &file.map {
            let Some(model) = table.by_name(&entry.model) else {
                warn!(model = %entry.model, "map entry refers to unknown flight model, skipped");
                continue;
            };
            match Regex::new(&entry.pattern) {
                Ok(re) => table.map.push((re, model)),
                Err(e) => warn!(pattern = %entry.pattern, error = %e, "invalid map pattern, skipped"),
            }
        }

        debug!(
            models = table.models.len(),
            map_entries = table.map.len(),
            "flight model table loaded"
        );
        Ok(table)
    }

    /// The fallback model.
    pub fn default_model(&self) -> Arc<FlightModel> {
        self.default.clone()
    }

    /// Look up a model by name. `default` always resolves.
    pub fn by_name(&self, name: &str) -> Option<Arc<FlightModel>> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .or_else(|| (name == DEFAULT_MODEL_NAME).then(|| self.default.clone()))
    }

    /// First map entry whose pattern matches the classification string.
    pub fn find(&self, classification: &str) -> Option<Arc<FlightModel>> {
        self.map
            .iter()
            .find(|(re, _)| re.is_match(classification))
            .map(|(_, m)| m.clone())
    }

    /// Model for an aircraft type, falling back to the default model.
    pub fn resolve(&self, ac_type: &AircraftType) -> Arc<FlightModel> {
        let classification = ac_type.classification();
        match self.find(&classification) {
            Some(m) => m,
            None => {
                warn!(
                    aircraft_type = %classification,
                    model = %self.default.name,
                    "no flight model matches aircraft type, using default"
                );
                self.default.clone()
            }
        }
    }
}
