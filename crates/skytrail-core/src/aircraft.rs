//! Static and dynamic aircraft identification data.

use serde::{Deserialize, Serialize};

/// Aircraft type designators used to pick a flight model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AircraftType {
    /// ICAO type designator, e.g. "A320".
    pub icao: String,
    /// Wake turbulence category: L, M, H or J.
    pub wtc: String,
    /// ICAO description class, e.g. "L2J" or "H1T".
    pub class: String,
    pub model: String,
    pub manufacturer: String,
}

impl AircraftType {
    /// Classification string matched against the flight model map:
    /// `wtc;class;type;model;manufacturer`.
    pub fn classification(&self) -> String {
        format!(
            "{};{};{};{};{}",
            self.wtc, self.class, self.icao, self.model, self.manufacturer
        )
    }

    /// Helicopters and gyrocopters.
    pub fn has_rotor(&self) -> bool {
        matches!(self.class.chars().next(), Some('H' | 'G'))
    }
}

/// Identification data that rarely changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticData {
    pub callsign: Option<String>,
    pub registration: Option<String>,
    pub aircraft_type: AircraftType,
}

impl StaticData {
    /// Display label: callsign, else registration, followed by the type.
    pub fn label(&self, key: &str) -> String {
        let id = self
            .callsign
            .as_deref()
            .or(self.registration.as_deref())
            .unwrap_or(key);
        if self.aircraft_type.icao.is_empty() {
            id.to_string()
        } else {
            format!("{id} ({})", self.aircraft_type.icao)
        }
    }
}

/// Transponder data refreshed periodically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicData {
    /// Time of the report (s).
    pub ts: f64,
    pub squawk: Option<u16>,
    pub emergency: bool,
}
