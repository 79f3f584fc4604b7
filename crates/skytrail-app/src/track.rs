//! Recorded waypoint tracks.
//!
//! A track file is a JSON array of reports, each tied to the simulated
//! time at which it was received.

use std::path::Path;

use serde::{Deserialize, Serialize};

use skytrail_core::aircraft::StaticData;
use skytrail_core::types::Waypoint;

use crate::errors::Result;

/// One received position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub key: String,
    /// Simulated time the report becomes available to the synthesizer.
    pub received_at: f64,
    pub waypoint: Waypoint,
    #[serde(default)]
    pub static_data: Option<StaticData>,
    /// Take-off rotation time, when the source knows it.
    #[serde(default)]
    pub rotate_ts: Option<f64>,
}

/// Parse a track, ordered by receive time.
pub fn parse_track(text: &str) -> Result<Vec<TrackRecord>> {
    let mut records: Vec<TrackRecord> = serde_json::from_str(text)?;
    records.sort_by(|a, b| a.received_at.total_cmp(&b.received_at));
    Ok(records)
}

pub fn load_track(path: &Path) -> Result<Vec<TrackRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_track(&text)
}

/// Simulated time span covered by the track: first receive time to the
/// last waypoint timestamp.
pub fn time_span(records: &[TrackRecord]) -> Option<(f64, f64)> {
    let start = records.iter().map(|r| r.received_at).reduce(f64::min)?;
    let end = records
        .iter()
        .map(|r| r.waypoint.ts.max(r.received_at))
        .reduce(f64::max)?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"[
        { "key": "b", "received_at": 12.0,
          "waypoint": { "lat": 1.0, "lon": 2.0, "alt_m": 300.0, "ts": 15.0 } },
        { "key": "a", "received_at": 2.0,
          "waypoint": { "lat": 1.0, "lon": 2.0, "alt_m": 300.0, "ts": 5.0 },
          "static_data": { "callsign": "SWR12" } }
    ]"#;

    #[test]
    fn test_parse_sorts_by_receive_time() {
        let records = parse_track(TRACK).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "a");
        assert_eq!(
            records[0].static_data.as_ref().unwrap().callsign.as_deref(),
            Some("SWR12")
        );
        assert!(records[1].static_data.is_none());
        assert_eq!(time_span(&records), Some((2.0, 15.0)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_track("{ not json").is_err());
        assert_eq!(time_span(&[]), None);
    }

    #[test]
    fn test_load_track_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.json");
        std::fs::write(&path, TRACK).unwrap();
        assert_eq!(load_track(&path).unwrap().len(), 2);
        assert!(load_track(&dir.path().join("missing.json")).is_err());
    }
}
