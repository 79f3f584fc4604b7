#[cfg(test)]
mod tests {
    use crate::aircraft::{AircraftType, StaticData};
    use crate::commands::EngineCommand;
    use crate::constants::*;
    use crate::enums::*;
    use crate::events::AircraftEvent;
    use crate::state::*;
    use crate::types::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    // ---- Heading helpers ----

    #[test]
    fn test_heading_normalize() {
        assert_eq!(heading_normalize(370.0), 10.0);
        assert_eq!(heading_normalize(-10.0), 350.0);
        assert_eq!(heading_normalize(360.0), 0.0);
        assert!(heading_normalize(-1e-15) < 360.0);
    }

    #[test]
    fn test_heading_diff_takes_short_way() {
        assert_eq!(heading_diff(350.0, 10.0), 20.0);
        assert_eq!(heading_diff(10.0, 350.0), -20.0);
        assert_eq!(heading_diff(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_heading_avg_across_north() {
        assert!(approx(heading_avg(350.0, 10.0), 0.0, 1e-9));
        assert!(approx(heading_avg(80.0, 100.0), 90.0, 1e-9));
    }

    #[test]
    fn test_vsi_to_deg() {
        assert!(approx(vsi_to_deg(100.0, 100.0), 45.0, 1e-9));
        assert_eq!(vsi_to_deg(100.0, 0.0), 0.0);
    }

    // ---- Geo math ----

    #[test]
    fn test_coord_distance_one_degree_longitude_at_equator() {
        let d = coord_distance(0.0, 0.0, 0.0, 1.0);
        // pi * EARTH_D / 360
        assert!(approx(d, 111_194.9, 1.0), "got {d}");
    }

    #[test]
    fn test_coord_angle_cardinals() {
        assert!(approx(coord_angle(0.0, 0.0, 1.0, 0.0), 0.0, 1e-9));
        assert!(approx(coord_angle(0.0, 0.0, 0.0, 1.0), 90.0, 1e-9));
        assert!(approx(coord_angle(0.0, 0.0, -1.0, 0.0), 180.0, 1e-9));
        assert!(approx(coord_angle(0.0, 0.0, 0.0, -1.0), 270.0, 1e-9));
    }

    #[test]
    fn test_dest_pos_inverts_between() {
        let a = Waypoint::new(47.0, 8.0, 500.0, 0.0);
        let b = Waypoint::new(47.1, 8.2, 500.0, 60.0);
        let vec = a.between(&b);
        let c = a.dest_pos(&vec);
        assert!(approx(c.lat, b.lat, 1e-6));
        assert!(approx(c.lon, b.lon, 1e-6));
    }

    #[test]
    fn test_between_speed_and_vsi() {
        let a = Waypoint::new(0.0, 0.0, 0.0, 0.0);
        let b = Waypoint::new(0.0, 1.0, 600.0, 100.0);
        let v = a.between(&b);
        assert!(approx(v.speed, v.dist / 100.0, 1e-9));
        assert!(approx(v.vsi, 6.0, 1e-9));
        assert!(approx(v.vsi_ft(), 6.0 / MS_PER_FTM, 1e-6));
        assert!(approx(v.speed_kn(), v.speed * KT_PER_M_PER_S, 1e-9));
    }

    #[test]
    fn test_between_zero_duration_is_infinite_speed() {
        let a = Waypoint::new(0.0, 0.0, 0.0, 5.0);
        let b = Waypoint::new(0.0, 0.1, 0.0, 5.0);
        let v = a.between(&b);
        assert!(v.speed.is_infinite());
        assert_eq!(v.vsi, 0.0);
    }

    #[test]
    fn test_blend_midpoint_and_extrapolation() {
        let a = Waypoint::new(0.0, 0.0, 100.0, 0.0).grounded();
        let b = Waypoint::new(0.0, 1.0, 300.0, 10.0);
        let m = a.blend(&b, 0.5);
        assert!(approx(m.lon, 0.5, 1e-12));
        assert!(approx(m.alt_m, 200.0, 1e-12));
        assert!(approx(m.ts, 5.0, 1e-12));
        assert!(m.on_ground, "ground flag follows 'from'");

        let e = a.blend(&b, 1.5);
        assert!(approx(e.lon, 1.5, 1e-12));
    }

    #[test]
    fn test_is_normal() {
        assert!(Waypoint::new(45.0, 10.0, 1000.0, 0.0).is_normal());
        assert!(!Waypoint::new(f64::NAN, 10.0, 1000.0, 0.0).is_normal());
        assert!(!Waypoint::new(91.0, 10.0, 1000.0, 0.0).is_normal());
        assert!(!Waypoint::new(45.0, 181.0, 1000.0, 0.0).is_normal());
        let mut too_high = Waypoint::new(45.0, 10.0, 0.0, 0.0);
        too_high.set_alt_ft(MDL_ALT_MAX + 1.0);
        assert!(!too_high.is_normal());
        let mut too_low = Waypoint::new(45.0, 10.0, 0.0, 0.0);
        too_low.set_alt_ft(MDL_ALT_MIN - 1.0);
        assert!(!too_low.is_normal());
    }

    // ---- Tick context ----

    #[test]
    fn test_tick_context_next_and_linearity() {
        let t0 = TickContext::at(100.0);
        let t1 = t0.next(100.5, 0.5);
        assert_eq!(t1.cycle, 1);
        assert!(approx(t1.diff_time, 0.5, 1e-12));
        assert!(t1.is_linear(DEFAULT_BUF_PERIOD));

        let back = t1.next(90.0, 1.0);
        assert!(!back.is_linear(DEFAULT_BUF_PERIOD));

        let jump = t1.next(100.5 + DEFAULT_BUF_PERIOD + 1.0, 1.0);
        assert!(!jump.is_linear(DEFAULT_BUF_PERIOD));
    }

    // ---- Enums ----

    #[test]
    fn test_flight_phase_order() {
        for pair in FlightPhase::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
        assert!(FlightPhase::RollOut >= FlightPhase::TouchDown);
        assert_eq!(FlightPhase::default(), FlightPhase::Unknown);
    }

    #[test]
    fn test_flight_phase_serde() {
        for v in FlightPhase::ALL {
            let json = serde_json::to_string(&v).unwrap();
            let back: FlightPhase = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }

    #[test]
    fn test_flight_phase_display() {
        assert_eq!(FlightPhase::TakeOffRoll.to_string(), "Take Off Roll");
        assert_eq!(FlightPhase::StoppedOnRunway.to_string(), "Stopped");
    }

    #[test]
    fn test_fetch_status_and_map() {
        let f: Fetch<i32> = Fetch::Ready(2);
        assert_eq!(f.status(), FetchResult::Success);
        assert_eq!(f.map(|v| v * 2).ready(), Some(4));
        let n: Fetch<i32> = Fetch::NoLock;
        assert_eq!(n.status(), FetchResult::NoLock);
        assert_eq!(n.ready(), None);
    }

    #[test]
    fn test_light_pattern_from_index() {
        assert_eq!(LightPattern::from_index(1), Some(LightPattern::Airbus));
        assert_eq!(LightPattern::from_index(3), None);
    }

    // ---- Aircraft data ----

    #[test]
    fn test_classification_string() {
        let t = AircraftType {
            icao: "A320".into(),
            wtc: "M".into(),
            class: "L2J".into(),
            model: "A-320".into(),
            manufacturer: "AIRBUS".into(),
        };
        assert_eq!(t.classification(), "M;L2J;A320;A-320;AIRBUS");
        assert!(!t.has_rotor());

        let heli = AircraftType {
            class: "H1T".into(),
            ..Default::default()
        };
        assert!(heli.has_rotor());
    }

    #[test]
    fn test_static_label_fallbacks() {
        let mut s = StaticData::default();
        assert_eq!(s.label("3c6444"), "3c6444");
        s.registration = Some("D-AIBL".into());
        s.aircraft_type.icao = "A319".into();
        assert_eq!(s.label("3c6444"), "D-AIBL (A319)");
        s.callsign = Some("DLH4TK".into());
        assert_eq!(s.label("3c6444"), "DLH4TK (A319)");
    }

    // ---- Snapshots, events, commands ----

    #[test]
    fn test_light_mask() {
        let lights = LightState {
            nav: true,
            beacon: true,
            ..Default::default()
        };
        assert_eq!(lights.mask(), LIGHT_NAV | LIGHT_BEACON);
        assert_eq!(LightState::default().mask(), 0);
    }

    #[test]
    fn test_snapshot_serde() {
        let snap = TrafficSnapshot {
            tick: TickContext::at(12.0),
            aircraft: vec![AircraftView {
                key: "abc123".into(),
                phase: FlightPhase::Cruise,
                ..Default::default()
            }],
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: TrafficSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.aircraft[0].phase, FlightPhase::Cruise);
        assert_eq!(back.tick.sim_time, 12.0);
    }

    #[test]
    fn test_event_and_command_serde_tagged() {
        let ev = AircraftEvent::PhaseChanged {
            key: "k".into(),
            from: FlightPhase::Taxi,
            to: FlightPhase::TakeOffRoll,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"PhaseChanged\""));
        let back: AircraftEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);

        let cmd = EngineCommand::RemoveAircraft { key: "k".into() };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("RemoveAircraft"));
    }

    #[test]
    fn test_waypoint_deserializes_with_defaults() {
        let json = r#"{"lat":1.0,"lon":2.0,"alt_m":3.0,"ts":4.0}"#;
        let w: Waypoint = serde_json::from_str(json).unwrap();
        assert!(!w.on_ground);
        assert_eq!(w.heading, 0.0);
        assert_eq!(w.phase_hint, None);
    }
}
