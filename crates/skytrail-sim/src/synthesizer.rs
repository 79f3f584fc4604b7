//! TrajectorySynthesizer: turns sparse, timestamped waypoints into a
//! smooth per-tick position and attitude for one aircraft.
//!
//! Each tick the synthesizer flies from waypoint `from` (`positions[0]`)
//! toward `to` (`positions[1]`). Crossing `to` switches to the next leg,
//! re-anchored on the last rendered position so the aircraft never jumps.
//! Heading, pitch and bank follow [`MotionParameter`]s; ground speed follows
//! an [`AccelParameter`] whose distance ratio replaces the plain time
//! fraction whenever speed changes along a leg.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, trace};

use skytrail_core::aircraft::{DynamicData, StaticData};
use skytrail_core::constants::{
    AC_HIDE_POS, DYN_DATA_REFRESH_CYCLES, HIDDEN_AI_PRIO, M_PER_FT, NEXT_VEC_LOOKAHEAD,
    PROBE_DELAY, PROBE_HEIGHT_LIM, SIMILAR_POS_DIST, TIME_REQU_POS,
};
use skytrail_core::enums::{Fetch, FetchResult, FlightPhase};
use skytrail_core::errors::{Result, TrajectoryError};
use skytrail_core::events::AircraftEvent;
use skytrail_core::state::{AircraftView, PositionSnapshot};
use skytrail_core::types::{
    coord_angle, dequal, heading_avg, heading_diff, vsi_to_deg, GeoVector, TickContext, Waypoint,
};
use skytrail_phase::fsm::{evaluate, PhaseContext, SurfaceCommand};
use skytrail_phase::profiles::FlightModel;
use skytrail_terrain::TerrainProbe;

use crate::accel::AccelParameter;
use crate::engine::EngineConfig;
use crate::motion::MotionParameter;
use crate::provider::FlightDataProvider;
use crate::surfaces::Surfaces;

/// Result of one [`TrajectorySynthesizer::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A new position was computed.
    NewData,
    /// No position this tick; the previous view stays valid.
    Unchanged,
    /// No position yet at all.
    Unavailable,
}

pub struct TrajectorySynthesizer {
    key: String,
    label: String,
    model: Arc<FlightModel>,
    has_rotor: bool,

    positions: VecDeque<Waypoint>,
    ppos: Option<Waypoint>,
    /// Ground flag of the rendered position.
    pos_on_ground: bool,
    /// Vector of the current leg.
    vec: GeoVector,
    /// Vertical speed (ft/min).
    vsi_ft: f64,
    on_ground: bool,
    phase: FlightPhase,
    rotate_ts: Option<f64>,
    /// The buffer ends in an invented stop waypoint.
    artificial: bool,
    need_next_vec: bool,
    last_calc_requested: f64,

    speed: AccelParameter,
    heading: MotionParameter,
    roll: MotionParameter,
    pitch: MotionParameter,
    surfaces: Surfaces,

    /// Terrain altitude below the aircraft (ft).
    terrain_alt_ft: f64,
    probe_next_ts: f64,
    camera_view: bool,
    visible: bool,
    auto_visible: bool,
    manual_visible: bool,
    ai_priority: u8,
    dynamic: DynamicData,
    next_dyn_refresh: u64,

    view: AircraftView,
}

impl TrajectorySynthesizer {
    pub fn new(
        key: impl Into<String>,
        static_data: &StaticData,
        model: Arc<FlightModel>,
        light_offset: f64,
    ) -> Self {
        let key = key.into();
        let m = &*model;

        let heading = MotionParameter::new(m.taxi_turn_time, 360.0, 0.0, true).named("heading");
        let mut roll = MotionParameter::new(
            2.0 * m.roll_max_bank / m.roll_rate,
            m.roll_max_bank,
            -m.roll_max_bank,
            false,
        )
        .named("roll");
        roll.set_val(0.0);
        let mut pitch = MotionParameter::new(
            (m.pitch_max - m.pitch_min) / m.pitch_rate,
            m.pitch_max,
            m.pitch_min,
            false,
        )
        .named("pitch");
        pitch.set_val(0.0);

        let label = static_data.label(&key);
        Self {
            view: AircraftView {
                key: key.clone(),
                label: label.clone(),
                label_color: m.label_color,
                ..Default::default()
            },
            has_rotor: static_data.aircraft_type.has_rotor(),
            surfaces: Surfaces::new(m, light_offset),
            key,
            label,
            positions: VecDeque::new(),
            ppos: None,
            pos_on_ground: false,
            vec: GeoVector::default(),
            vsi_ft: 0.0,
            on_ground: false,
            phase: FlightPhase::Unknown,
            rotate_ts: None,
            artificial: false,
            need_next_vec: false,
            last_calc_requested: f64::NEG_INFINITY,
            speed: AccelParameter::default(),
            heading,
            roll,
            pitch,
            terrain_alt_ft: 0.0,
            probe_next_ts: f64::NEG_INFINITY,
            camera_view: false,
            visible: true,
            auto_visible: true,
            manual_visible: true,
            ai_priority: 2,
            dynamic: DynamicData::default(),
            next_dyn_refresh: 0,
            model,
        }
    }

    /// Compute this tick's position, attitude and surfaces.
    ///
    /// Expected gaps in the data are reported through [`AdvanceOutcome`].
    /// An `Err` means the aircraft can no longer be computed.
    pub fn advance(
        &mut self,
        tick: &TickContext,
        provider: &dyn FlightDataProvider,
        terrain: &dyn TerrainProbe,
        config: &EngineConfig,
        events: &mut Vec<AircraftEvent>,
    ) -> Result<AdvanceOutcome> {
        if !self.calc_ppos(tick, provider, terrain, config, events)? {
            return Ok(if self.ppos.is_some() {
                AdvanceOutcome::Unchanged
            } else {
                AdvanceOutcome::Unavailable
            });
        }
        self.refresh_dynamic(tick, provider);
        self.update_view(tick);
        Ok(AdvanceOutcome::NewData)
    }

    fn calc_ppos(
        &mut self,
        tick: &TickContext,
        provider: &dyn FlightDataProvider,
        terrain: &dyn TerrainProbe,
        config: &EngineConfig,
        events: &mut Vec<AircraftEvent>,
    ) -> Result<bool> {
        let now = tick.sim_time;
        let mut switched = self.phase == FlightPhase::Unknown;

        // need 'from' and 'to'
        while self.positions.len() < 2 {
            let before = self.positions.len();
            match provider.try_fetch_new_pos(&mut self.positions, &mut self.rotate_ts) {
                FetchResult::Success if self.positions.len() > before => self.artificial = false,
                FetchResult::Success | FetchResult::NoData => {
                    self.last_calc_requested = now;
                    provider.trigger_calc_new_pos(now);
                    debug!(aircraft = %self.key, buffered = self.positions.len(), "no positions available");
                    return Ok(false);
                }
                FetchResult::NoLock => return Ok(false),
                FetchResult::TechError => return Err(TrajectoryError::ProviderFailed),
            }
        }

        let last_ts = self.positions.back().map_or(now, |p| p.ts);
        if last_ts <= now + 2.0 * TIME_REQU_POS
            && self.last_calc_requested + 2.0 * TIME_REQU_POS <= now
        {
            provider.trigger_calc_new_pos(now.max(last_ts));
            self.last_calc_requested = now;
        }
        if last_ts <= now + TIME_REQU_POS
            && provider.try_fetch_new_pos(&mut self.positions, &mut self.rotate_ts)
                == FetchResult::Success
        {
            self.artificial = false;
        }

        // passed 'to' and there is a next one: switch legs
        while self.positions.len() >= 3 && self.positions[1].ts <= now {
            self.positions.pop_front();
            if let Some(ppos) = self.ppos {
                if ppos.ts < self.positions[1].ts {
                    self.positions[0] = ppos;
                }
            }
            switched = true;
        }

        let duration = self.positions[1].ts - self.positions[0].ts;
        if duration.is_nan() || duration <= 0.0 {
            return Err(TrajectoryError::NumericInvalid(format!(
                "leg {} -> {} has no duration",
                self.positions[0].ts, self.positions[1].ts
            )));
        }

        if switched {
            self.start_leg(tick);
        }
        if self.need_next_vec {
            self.reconcile_speed(tick, provider);
        }

        let from = self.positions[0];
        let to = self.positions[1];

        let f = match self.speed.get_ratio(now) {
            Some(ratio) => {
                self.speed.update_speed(now);
                ratio
            }
            None => (now - from.ts) / duration,
        };

        let mut pos = from.blend(&to, f);
        pos.ts = now;
        pos.on_ground = self.pos_on_ground;
        if !pos.is_normal() {
            return Err(TrajectoryError::NumericInvalid(format!(
                "lat {:.5} lon {:.5} alt {:.0} ft at f {:.3}",
                pos.lat,
                pos.lon,
                pos.alt_ft(),
                f
            )));
        }

        // ran past the last waypoint on the ground: invent a stop
        if f > 1.0 && self.is_ground_run() && self.speed.m_s() > 0.0 && !self.artificial {
            self.insert_stop(&pos, events);
        }

        self.turn_second_half(f, &to, tick);
        if f > 1.0 {
            self.roll.move_to(0.0, None, tick);
        }
        pos.heading = self.heading.get(tick);
        pos.pitch = self.pitch.get(tick);
        pos.roll = self.roll.get(tick);

        self.probe_terrain(&pos, tick, provider, terrain);
        self.update_phase(&pos, &to, tick, config, events);
        pos.on_ground = self.pos_on_ground;

        if self.on_ground {
            pos.set_alt_ft(self.terrain_alt_ft);
            self.vsi_ft = 0.0;
            self.surfaces.set_tire_rpm_from_speed(self.speed.kt());
        } else if self.phase == FlightPhase::LiftOff && dequal(self.vsi_ft, 0.0) && to.ts > now {
            self.vsi_ft = pos.between(&to).vsi_ft();
        }

        self.calc_visible(config, pos.alt_ft() - self.terrain_alt_ft);
        self.ppos = Some(pos);
        Ok(true)
    }

    /// Set up heading, bank, pitch and speed for a new leg.
    fn start_leg(&mut self, tick: &TickContext) {
        let m = Arc::clone(&self.model);

        self.positions[0].normalize();
        self.positions[1].normalize();
        let from = self.positions[0];
        let to = self.positions[1];

        self.vec = from.between(&to);
        self.vsi_ft = self.vec.vsi_ft();

        if self.phase == FlightPhase::Unknown {
            self.on_ground = from.on_ground;
            self.speed.set_speed(self.vec.speed);
            self.heading.set_val(from.heading);
            if from.on_ground {
                self.surfaces.gear.set_val(1.0);
            }
        }
        self.pos_on_ground = from.on_ground;

        // turn toward the leg by half its time; very short legs only turn
        // to the average of the waypoint headings
        self.heading.def_duration = self.turn_time();
        let target = if self.vec.dist > SIMILAR_POS_DIST {
            self.vec.angle
        } else {
            heading_avg(from.heading, to.heading)
        };
        self.heading
            .move_quickest_to_by(None, target, None, (from.ts + to.ts) / 2.0, true, tick);

        if !self.on_ground && self.phase != FlightPhase::Flare && self.heading.is_programmed(tick) {
            let level_by = self.heading.to_ts().unwrap_or(tick.sim_time);
            self.roll
                .move_quickest_to_by(None, 0.0, None, level_by, false, tick);
        } else {
            self.roll.move_to(0.0, None, tick);
        }

        let to_pitch = self.target_pitch(&m, &from, &to);
        self.positions[1].pitch = to_pitch;
        if self.phase != FlightPhase::Rotate {
            self.pitch
                .move_quickest_to_by(None, to_pitch, None, to.ts, true, tick);
        }

        // short final keeps its speed, the next leg is already the roll-out
        self.need_next_vec = false;
        if !from.on_ground && to.on_ground {
            self.speed.set_speed(self.vec.speed);
        } else {
            // the old ramp describes the previous leg; hold the current speed
            // until the next vector reconciles it
            self.speed.set_speed(self.speed.m_s());
            self.need_next_vec = true;
        }

        trace!(
            aircraft = %self.key,
            from_ts = from.ts,
            to_ts = to.ts,
            angle = self.vec.angle,
            speed_kn = self.vec.speed_kn(),
            vsi_ft = self.vsi_ft,
            "switched to next leg"
        );
    }

    /// Pitch from vertical speed, or the flight path angle when climbing.
    fn target_pitch(&self, m: &FlightModel, from: &Waypoint, to: &Waypoint) -> f64 {
        let vsi = self.vsi_ft;
        let mut p = if from.on_ground && to.on_ground {
            0.0
        } else if vsi < m.pitch_min_vsi {
            m.pitch_min
        } else if vsi > m.pitch_max_vsi {
            m.pitch_max
        } else {
            let span = (m.pitch_max_vsi - m.pitch_min_vsi).max(1.0);
            m.pitch_min + (vsi - m.pitch_min_vsi) / span * (m.pitch_max - m.pitch_min)
        };

        if vsi > m.vsi_stable {
            p = vsi_to_deg(self.vec.speed, self.vec.vsi)
                .max(m.pitch_min)
                .min(m.pitch_max);
        }

        if !self.on_ground && self.vec.speed_kn() < m.flaps_down_speed.max(m.flaps_up_speed) {
            p = (p + m.pitch_flap_add).min(m.pitch_max);
        }
        p
    }

    /// Aim the speed at the distance-weighted average of this leg and the
    /// next one.
    fn reconcile_speed(&mut self, tick: &TickContext, provider: &dyn FlightDataProvider) {
        let from = self.positions[0];
        let to = self.positions[1];
        let mut target = None;

        if to.ts > tick.sim_time {
            let next = match self.positions.get(2) {
                Some(after) => Fetch::Ready(to.between(after)),
                None => provider.try_get_vec(&to, to.ts + NEXT_VEC_LOOKAHEAD),
            };
            match next {
                Fetch::Ready(next) if next.speed.is_finite() => {
                    let total = self.vec.dist + next.dist;
                    target = Some(if total > 0.0 {
                        (self.vec.speed * next.dist + next.speed * self.vec.dist) / total
                    } else {
                        self.vec.speed
                    });
                }
                // retry next tick
                Fetch::NoLock => {}
                // invented roll-out: brake to a stop
                Fetch::NoData if self.artificial && self.is_ground_run() => target = Some(0.0),
                _ => self.need_next_vec = false,
            }
        } else {
            self.need_next_vec = false;
        }

        if let Some(target) = target {
            self.speed
                .start_speed_control(self.speed.m_s(), target, self.vec.dist, from.ts, to.ts);
            self.need_next_vec = false;
        } else if !self.need_next_vec {
            self.speed.set_speed(self.vec.speed);
        }
    }

    fn is_ground_run(&self) -> bool {
        self.phase == FlightPhase::Taxi || self.phase >= FlightPhase::TouchDown
    }

    /// Decelerate to zero along the current heading and queue the stop point.
    fn insert_stop(&mut self, pos: &Waypoint, events: &mut Vec<AircraftEvent>) {
        let now = pos.ts;
        self.speed
            .start_accel(self.speed.m_s(), 0.0, self.model.roll_out_decel, now);
        let (Some(stop_ts), Some(stop_dist)) =
            (self.speed.target_time(), self.speed.target_delta_dist())
        else {
            return;
        };

        let heading = self.heading.is();
        let mut stop = pos.dest_pos(&GeoVector::new(heading, stop_dist));
        stop.ts = stop_ts;
        stop.heading = heading;
        self.positions.push_back(*pos);
        self.positions.push_back(stop);
        self.artificial = true;

        debug!(
            aircraft = %self.key,
            stop_ts,
            stop_dist,
            lat = stop.lat,
            lon = stop.lon,
            "invented stop position"
        );
        events.push(AircraftEvent::SyntheticStop {
            key: self.key.clone(),
            ts: stop_ts,
        });
    }

    /// Past half the leg, turn to the heading `to` itself reports, finishing
    /// exactly at `to`, and bank into the turn while it runs.
    fn turn_second_half(&mut self, f: f64, to: &Waypoint, tick: &TickContext) {
        if !(f > 0.5 && f < 1.0) {
            return;
        }
        let aimed_at = self.heading.to_val().unwrap_or(self.heading.is());
        if dequal(aimed_at, to.heading) {
            return;
        }
        self.heading.def_duration = self.turn_time();
        self.heading
            .move_quickest_to_by(None, to.heading, None, to.ts, false, tick);

        if !self.on_ground && self.phase != FlightPhase::Flare && self.heading.is_programmed(tick) {
            let bank = if self.heading.is_increase() {
                self.roll.max()
            } else {
                self.roll.min()
            };
            self.roll.move_to(bank, self.heading.from_ts(), tick);
        }
    }

    fn turn_time(&self) -> f64 {
        if self.on_ground {
            self.model.taxi_turn_time
        } else {
            self.model.flight_turn_time
        }
    }

    /// Probe the ground below `pos`, more often the lower the aircraft is.
    /// AI priority and label are refreshed along with the scheduled probes.
    fn probe_terrain(
        &mut self,
        pos: &Waypoint,
        tick: &TickContext,
        provider: &dyn FlightDataProvider,
        terrain: &dyn TerrainProbe,
    ) {
        let now = tick.sim_time;
        let due = now >= self.probe_next_ts;
        if !due && !(self.camera_view && self.on_ground) {
            return;
        }

        self.terrain_alt_ft = terrain.elevation_m(pos.lat, pos.lon).unwrap_or(0.0) / M_PER_FT;

        if due {
            let height = pos.alt_ft() - self.terrain_alt_ft;
            let band = PROBE_HEIGHT_LIM
                .iter()
                .position(|lim| height >= *lim)
                .unwrap_or(PROBE_DELAY.len() - 1);
            self.probe_next_ts = now + PROBE_DELAY[band];

            self.ai_priority = self.calc_ai_priority(pos, tick);
            if let Fetch::Ready(static_data) = provider.try_copy_static() {
                self.label = static_data.label(&self.key);
            }
        }
    }

    /// 0 in front of the viewer, 1 to the side, 2 behind; 3 more for
    /// aircraft on the ground while the viewer flies.
    fn calc_ai_priority(&self, pos: &Waypoint, tick: &TickContext) -> u8 {
        if self.camera_view {
            return 0;
        }
        let Some(viewer) = tick.viewer else {
            return 2;
        };
        let track = if viewer.on_ground {
            viewer.heading
        } else {
            viewer.track
        };
        let bearing = coord_angle(viewer.lat, viewer.lon, pos.lat, pos.lon);
        let diff = heading_diff(track, bearing).abs();

        let mut prio = if diff < 30.0 {
            0
        } else if diff < 90.0 {
            1
        } else {
            2
        };
        if !viewer.on_ground && self.on_ground {
            prio += 3;
        }
        prio
    }

    fn update_phase(
        &mut self,
        pos: &Waypoint,
        to: &Waypoint,
        tick: &TickContext,
        config: &EngineConfig,
        events: &mut Vec<AircraftEvent>,
    ) {
        let model = Arc::clone(&self.model);
        let ctx = PhaseContext {
            model: &*model,
            phase: self.phase,
            was_on_ground: self.on_ground,
            pos_on_ground: self.pos_on_ground,
            to_on_ground: to.on_ground,
            height_ft: pos.alt_ft() - self.terrain_alt_ft,
            alt_ft: pos.alt_ft(),
            vsi_ft: self.vsi_ft,
            speed_kn: self.speed.kt(),
            speed_is_zero: self.speed.is_zero(),
            artificial: self.artificial,
            rotate_ts: self.rotate_ts,
            sim_time: tick.sim_time,
            landing_lights_taxi: config.landing_lights_taxi,
        };
        let update = evaluate(&ctx);

        let prev = self.phase;
        self.phase = update.phase;
        self.on_ground = update.on_ground;
        self.pos_on_ground = update.on_ground;

        for cmd in update.commands {
            match cmd {
                SurfaceCommand::PitchTo(p) => self.pitch.move_to(p, None, tick),
                SurfaceCommand::RollTo(r) => self.roll.move_to(r, None, tick),
                SurfaceCommand::ConsumeRotateTs => self.rotate_ts = None,
                SurfaceCommand::ForceOnGround => {
                    self.on_ground = true;
                    self.pos_on_ground = true;
                }
                other => self.surfaces.apply(other, tick),
            }
        }

        if update.phase_changed {
            debug!(aircraft = %self.key, from = %prev, to = %self.phase, "flight phase changed");
            events.push(AircraftEvent::PhaseChanged {
                key: self.key.clone(),
                from: prev,
                to: self.phase,
            });
        }
    }

    fn refresh_dynamic(&mut self, tick: &TickContext, provider: &dyn FlightDataProvider) {
        if tick.cycle < self.next_dyn_refresh {
            return;
        }
        if let Fetch::Ready(dynamic) = provider.try_copy_dynamic() {
            self.dynamic = dynamic;
            self.next_dyn_refresh = tick.cycle + DYN_DATA_REFRESH_CYCLES;
        }
    }

    fn update_view(&mut self, tick: &TickContext) {
        let Some(pos) = self.ppos else {
            return;
        };
        let deflection = self.surfaces.deflection(tick);

        let position = if self.visible {
            PositionSnapshot {
                lat: pos.lat,
                lon: pos.lon,
                elevation_m: if pos.on_ground {
                    pos.alt_m - deflection
                } else {
                    pos.alt_m
                },
                heading: pos.heading,
                pitch: pos.pitch,
                roll: pos.roll,
                on_ground: pos.on_ground,
                visible: true,
                ai_priority: self.ai_priority,
            }
        } else {
            let (lat, lon, elevation_m) = AC_HIDE_POS;
            PositionSnapshot {
                lat,
                lon,
                elevation_m,
                visible: false,
                ai_priority: HIDDEN_AI_PRIO,
                ..Default::default()
            }
        };

        self.view = AircraftView {
            key: self.key.clone(),
            label: self.label.clone(),
            label_color: self.model.label_color,
            phase: self.phase,
            speed_kn: self.speed.kt(),
            vsi_ft: self.vsi_ft,
            squawk: self.dynamic.squawk,
            position,
            surfaces: self.surfaces.animate(tick, &self.model, self.has_rotor),
        };
    }

    // --- visibility ---

    /// Show or hide manually; switches off automatic visibility.
    pub fn set_visible(&mut self, visible: bool) {
        self.auto_visible = false;
        self.manual_visible = visible;
        if visible != self.visible {
            self.visible = visible;
            info!(aircraft = %self.label, visible, "aircraft visibility set");
        }
    }

    /// Hand visibility back to the auto-hide rules. Returns the new state.
    pub fn set_auto_visible(&mut self, config: &EngineConfig) -> bool {
        self.auto_visible = true;
        let height = self
            .ppos
            .map_or(f64::INFINITY, |p| p.alt_ft() - self.terrain_alt_ft);
        self.calc_visible(config, height)
    }

    fn calc_visible(&mut self, config: &EngineConfig, height_ft: f64) -> bool {
        let prev = self.visible;
        self.visible = if !config.auto_hide || !self.auto_visible {
            self.manual_visible
        } else if config.hide_taxiing
            && matches!(self.phase, FlightPhase::Taxi | FlightPhase::StoppedOnRunway)
        {
            false
        } else {
            !(config.hide_below_agl_ft > 0.0 && height_ft < config.hide_below_agl_ft)
        };

        if prev != self.visible {
            info!(aircraft = %self.label, visible = self.visible, "aircraft visibility changed automatically");
        }
        self.visible
    }

    pub fn set_camera_view(&mut self, on: bool) {
        self.camera_view = on;
    }

    // --- accessors ---

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn is_on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_artificial(&self) -> bool {
        self.artificial
    }

    /// Current ground speed (kn).
    pub fn speed_kn(&self) -> f64 {
        self.speed.kt()
    }

    /// Last rendered position, `None` before the first successful tick.
    pub fn position(&self) -> Option<&Waypoint> {
        self.ppos.as_ref()
    }

    pub fn has_position(&self) -> bool {
        self.ppos.is_some()
    }

    /// Waypoint buffer, `from` first.
    pub fn positions(&self) -> &VecDeque<Waypoint> {
        &self.positions
    }

    /// The view built by the last successful advance.
    pub fn view(&self) -> &AircraftView {
        &self.view
    }
}

impl std::fmt::Debug for TrajectorySynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectorySynthesizer")
            .field("key", &self.key)
            .field("phase", &self.phase)
            .field("on_ground", &self.on_ground)
            .field("buffered", &self.positions.len())
            .field("ppos", &self.ppos)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SharedFlightData;
    use skytrail_terrain::FlatTerrain;

    fn tick(cycle: u64, t: f64, dt: f64) -> TickContext {
        TickContext {
            cycle,
            sim_time: t,
            diff_time: dt,
            ..Default::default()
        }
    }

    fn synth() -> TrajectorySynthesizer {
        TrajectorySynthesizer::new(
            "3c6444",
            &StaticData::default(),
            Arc::new(FlightModel::default()),
            0.0,
        )
    }

    fn feed(wps: &[Waypoint]) -> SharedFlightData {
        let fd = SharedFlightData::new("3c6444", StaticData::default());
        for wp in wps {
            assert!(fd.add_waypoint(*wp).unwrap());
        }
        fd
    }

    fn airborne(lon: f64, ts: f64, heading: f64) -> Waypoint {
        let mut wp = Waypoint::new(0.0, lon, 0.0, ts).with_heading(heading);
        wp.set_alt_ft(1000.0);
        wp
    }

    #[test]
    fn test_unavailable_without_two_waypoints() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0)]);
        let mut events = Vec::new();
        let out = s
            .advance(&tick(1, 0.0, 0.0), &fd, &FlatTerrain::default(), &EngineConfig::default(), &mut events)
            .unwrap();
        assert_eq!(out, AdvanceOutcome::Unavailable);
        assert_eq!(fd.take_calc_request().unwrap(), Some(0.0));
    }

    #[test]
    fn test_linear_progress_at_constant_speed() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 0.0), airborne(1.0, 300.0, 90.0)]);
        let terrain = FlatTerrain::default();
        let cfg = EngineConfig::default();
        let mut events = Vec::new();

        for (i, t) in [0.0, 75.0, 150.0].into_iter().enumerate() {
            let out = s.advance(&tick(i as u64, t, 75.0), &fd, &terrain, &cfg, &mut events).unwrap();
            assert_eq!(out, AdvanceOutcome::NewData);
        }
        let pos = s.position().unwrap();
        assert!((pos.lon - 0.5).abs() < 1e-9, "lon {}", pos.lon);
        assert!(pos.lat.abs() < 1e-9);
        assert_eq!(s.phase(), FlightPhase::Cruise);
        assert!((s.view().position.heading - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_lock_keeps_previous_view() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 90.0)]);
        let terrain = FlatTerrain::default();
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        s.advance(&tick(1, 10.0, 0.0), &fd, &terrain, &cfg, &mut events).unwrap();
        let before = s.view().clone();

        // waypoints are all consumed, the buffer is fine without the lock
        let out = fd
            .with_positions_mut(|_| s.advance(&tick(2, 11.0, 1.0), &fd, &terrain, &cfg, &mut events))
            .unwrap()
            .unwrap();
        assert_eq!(out, AdvanceOutcome::NewData);
        assert_ne!(s.view(), &before);
    }

    #[test]
    fn test_numeric_invalid_when_extrapolating_out_of_range() {
        let mut s = synth();
        let mut a = airborne(0.0, 0.0, 90.0);
        let mut b = airborne(0.01, 10.0, 90.0);
        a.set_alt_ft(30_000.0);
        b.set_alt_ft(50_000.0);
        let fd = feed(&[a, b]);
        let mut events = Vec::new();
        let err = s
            .advance(&tick(1, 100.0, 0.0), &fd, &FlatTerrain::default(), &EngineConfig::default(), &mut events)
            .unwrap_err();
        assert!(matches!(err, TrajectoryError::NumericInvalid(_)));
    }

    #[test]
    fn test_hidden_aircraft_parks() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 90.0)]);
        let mut events = Vec::new();
        s.set_visible(false);
        s.advance(&tick(1, 10.0, 0.0), &fd, &FlatTerrain::default(), &EngineConfig::default(), &mut events)
            .unwrap();
        let p = &s.view().position;
        assert!(!p.visible);
        assert_eq!(p.ai_priority, HIDDEN_AI_PRIO);
        assert_eq!((p.lat, p.lon), (AC_HIDE_POS.0, AC_HIDE_POS.1));
    }

    #[test]
    fn test_auto_hide_taxiing() {
        let mut s = synth();
        let a = Waypoint::new(47.0, 8.0, 400.0, 0.0).grounded();
        let b = Waypoint::new(47.0, 8.001, 400.0, 20.0).grounded();
        let fd = feed(&[a, b]);
        let cfg = EngineConfig {
            auto_hide: true,
            hide_taxiing: true,
            ..Default::default()
        };
        let mut events = Vec::new();
        s.advance(&tick(1, 5.0, 0.0), &fd, &FlatTerrain::new(400.0), &cfg, &mut events)
            .unwrap();
        assert_eq!(s.phase(), FlightPhase::Taxi);
        assert!(!s.is_visible());
        s.set_visible(true);
        assert!(s.is_visible());
    }

    #[test]
    fn test_ai_priority_relative_to_viewer() {
        let mut s = synth();
        let fd = feed(&[airborne(0.1, 0.0, 90.0), airborne(0.2, 100.0, 90.0)]);
        let mut t = tick(1, 1.0, 0.0);
        // viewer west of the aircraft, flying east
        t.viewer = Some(skytrail_core::types::Viewer {
            track: 90.0,
            ..Default::default()
        });
        let mut events = Vec::new();
        s.advance(&t, &fd, &FlatTerrain::default(), &EngineConfig::default(), &mut events)
            .unwrap();
        assert_eq!(s.view().position.ai_priority, 0);
    }

    /// Advance through `times`, one tick each, over flat sea-level terrain.
    fn fly(s: &mut TrajectorySynthesizer, fd: &SharedFlightData, times: &[f64]) {
        let terrain = FlatTerrain::default();
        let cfg = EngineConfig::default();
        let mut events = Vec::new();
        let mut prev = times[0];
        for (i, &t) in times.iter().enumerate() {
            s.advance(&tick(i as u64, t, t - prev), fd, &terrain, &cfg, &mut events)
                .unwrap();
            prev = t;
        }
    }

    // ---- Turns and bank ----

    #[test]
    fn test_short_leg_turns_to_average_heading() {
        let mut s = synth();
        let from = airborne(0.0, 0.0, 80.0);
        // 2 m north: the bearing says 0, the waypoints say 80 and 100
        let mut to = airborne(0.0, 10.0, 100.0);
        to.lat = 2.0 / 111_195.0;
        let fd = feed(&[from, to]);

        fly(&mut s, &fd, &[0.0, 4.0]);
        assert!((s.view().position.heading - 90.0).abs() < 1e-6, "heading {}", s.view().position.heading);
    }

    #[test]
    fn test_second_half_turn_banks_and_levels() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 120.0)]);

        fly(&mut s, &fd, &[0.0, 51.0]);
        // 30° at 120 s per full circle, finishing exactly at 'to'
        assert!((s.heading.from_ts().unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(s.heading.to_ts(), Some(100.0));
        assert_eq!(s.view().position.roll, 0.0, "bank waits for the turn");

        fly(&mut s, &fd, &[95.0]);
        let p = &s.view().position;
        assert!((p.roll - 30.0).abs() < 1e-9, "right turn banks right: {}", p.roll);
        assert!((p.heading - 105.0).abs() < 1e-6, "heading {}", p.heading);

        // past 'to' with nothing buffered: level the wings
        fly(&mut s, &fd, &[101.0, 105.0]);
        let p = &s.view().position;
        assert!(p.roll.abs() < 1e-9, "roll {}", p.roll);
        assert!((p.heading - 120.0).abs() < 1e-6);
    }

    #[test]
    fn test_left_turn_banks_left() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 60.0)]);
        fly(&mut s, &fd, &[0.0, 51.0, 95.0]);
        assert!((s.view().position.roll + 30.0).abs() < 1e-9, "roll {}", s.view().position.roll);
    }

    #[test]
    fn test_taxi_turn_does_not_bank() {
        let mut s = synth();
        let fd = feed(&[
            Waypoint::new(0.0, 0.0, 0.0, 0.0).grounded().with_heading(90.0),
            Waypoint::new(0.0, 0.01, 0.0, 100.0).grounded().with_heading(120.0),
        ]);
        for t in [0.0, 51.0, 99.0] {
            fly(&mut s, &fd, &[t]);
            assert_eq!(s.phase(), FlightPhase::Taxi);
            assert_eq!(s.view().position.roll, 0.0, "roll at t={t}");
        }
        let heading = s.view().position.heading;
        assert!(heading > 90.0 && heading < 120.0, "turning at taxi rate: {heading}");
    }

    // ---- Pitch ----

    #[test]
    fn test_target_pitch_follows_vertical_speed() {
        let m = FlightModel::default();
        let mut s = synth();
        let (from, to) = (airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 90.0));
        // 154 m/s is about 300 kn, well above flap speeds
        s.vec = GeoVector {
            speed: 154.0,
            ..Default::default()
        };

        s.vsi_ft = 0.0;
        assert!((s.target_pitch(&m, &from, &to) - (-2.0 + 20.0 / 3.0)).abs() < 1e-9);

        s.vsi_ft = -2000.0;
        assert_eq!(s.target_pitch(&m, &from, &to), m.pitch_min);

        // climbing: flight path angle instead of the vsi table
        s.vsi_ft = 1000.0;
        s.vec.vsi = 5.08;
        let p = s.target_pitch(&m, &from, &to);
        assert!((p - vsi_to_deg(154.0, 5.08)).abs() < 1e-9, "pitch {p}");
    }

    #[test]
    fn test_target_pitch_adds_flap_pitch_when_slow() {
        let m = FlightModel::default();
        let mut s = synth();
        let (from, to) = (airborne(0.0, 0.0, 90.0), airborne(0.1, 100.0, 90.0));
        s.vec = GeoVector {
            speed: 60.0,
            ..Default::default()
        };
        s.vsi_ft = 0.0;
        let p = s.target_pitch(&m, &from, &to);
        assert!((p - (2.0 + 20.0 / 3.0)).abs() < 1e-9, "pitch {p}");

        // steep and slow: capped at the maximum
        s.vsi_ft = 3000.0;
        s.vec.vsi = 50.0;
        assert_eq!(s.target_pitch(&m, &from, &to), m.pitch_max);
    }

    #[test]
    fn test_target_pitch_level_on_ground() {
        let m = FlightModel::default();
        let mut s = synth();
        let from = Waypoint::new(0.0, 0.0, 0.0, 0.0).grounded();
        let to = Waypoint::new(0.0, 0.001, 0.0, 10.0).grounded();
        s.on_ground = true;
        s.vec = GeoVector {
            speed: 10.0,
            ..Default::default()
        };
        assert_eq!(s.target_pitch(&m, &from, &to), 0.0);
    }

    // ---- Buffering ----

    #[test]
    fn test_calc_requests_are_rate_limited() {
        let mut s = synth();
        let fd = feed(&[airborne(0.0, 0.0, 90.0), airborne(0.01, 10.0, 90.0)]);
        fly(&mut s, &fd, &[0.0]);
        assert_eq!(fd.take_calc_request().unwrap(), None, "plenty buffered");

        let mut requests = Vec::new();
        for t in [9.0, 9.25, 9.5, 9.75, 10.0] {
            fly(&mut s, &fd, &[t]);
            requests.push(fd.take_calc_request().unwrap());
        }
        assert_eq!(requests, vec![Some(10.0), None, None, None, Some(10.0)]);
    }

    // ---- Speed ----

    /// Level at 500 ft and 100 m/s, then a leg to `third` and one more
    /// 200 m/s leg after it.
    fn approach(third_on_ground: bool) -> SharedFlightData {
        let at = |lon: f64, ts: f64, on_ground: bool| {
            let mut wp = Waypoint::new(0.0, lon, 0.0, ts).with_heading(90.0);
            if on_ground {
                wp.on_ground = true;
            } else {
                wp.set_alt_ft(500.0);
            }
            wp
        };
        let deg = |m: f64| m / 111_195.0;
        let w1 = deg(3000.0);
        let w2 = w1 + deg(4500.0);
        let w3 = w2 + deg(6000.0);
        feed(&[
            at(0.0, 0.0, false),
            at(w1, 30.0, false),
            at(w2, 60.0, third_on_ground),
            at(w3, 90.0, third_on_ground),
        ])
    }

    #[test]
    fn test_final_leg_holds_constant_speed() {
        let mut s = synth();
        let fd = approach(true);
        fly(&mut s, &fd, &[0.0, 10.0, 20.0, 29.5, 30.0]);

        assert!(s.positions[1].on_ground, "flying the leg to touchdown");
        assert!(!s.speed.is_changing());
        assert!(!s.need_next_vec);
        assert!((s.speed.m_s() - s.vec.speed).abs() < 1e-9);
    }

    #[test]
    fn test_airborne_leg_reconciles_speed_with_next() {
        let mut s = synth();
        let fd = approach(false);
        fly(&mut s, &fd, &[0.0, 10.0, 20.0, 29.5, 30.0]);

        assert!(!s.positions[1].on_ground);
        assert!(s.speed.is_changing(), "ramps toward the faster leg");
        assert!(!s.need_next_vec);
    }
}
