//! Moving parts of an aircraft: gear, flaps, spoilers, reversers, tires,
//! propellers and lights.

use skytrail_core::constants::{
    KT_PER_M_PER_S, MDL_GEAR_DEFL_TIME, MDL_REVERSERS_TIME, MDL_SPOILERS_TIME, MDL_TIRE_CF_M,
    MDL_TIRE_MAX_RPM, MDL_TIRE_SLOW_TIME,
};
use skytrail_core::state::{LightState, SurfacesSnapshot};
use skytrail_core::types::TickContext;
use skytrail_phase::fsm::{LightKind, Setpoint, SurfaceCommand};
use skytrail_phase::profiles::FlightModel;

use crate::motion::MotionParameter;

#[derive(Debug, Clone)]
pub struct Surfaces {
    pub gear: MotionParameter,
    pub flaps: MotionParameter,
    pub spoilers: MotionParameter,
    pub reversers: MotionParameter,
    pub tire_rpm: MotionParameter,
    /// Main gear compression (m) right after touch-down.
    pub gear_deflection: MotionParameter,
    pub thrust: f64,
    pub lights: LightState,
    tire_deg: f64,
    prop_rpm: f64,
    prop_deg: f64,
    /// Per-aircraft light offset, applied whenever the lights are reset.
    light_offset: f64,
}

impl Surfaces {
    pub fn new(model: &FlightModel, light_offset: f64) -> Self {
        Self {
            gear: MotionParameter::ratio(model.gear_duration).named("gear"),
            flaps: MotionParameter::ratio(model.flaps_duration).named("flaps"),
            spoilers: MotionParameter::ratio(MDL_SPOILERS_TIME).named("spoilers"),
            reversers: MotionParameter::ratio(MDL_REVERSERS_TIME).named("reversers"),
            tire_rpm: MotionParameter::new(MDL_TIRE_SLOW_TIME, MDL_TIRE_MAX_RPM, 0.0, false)
                .named("tire_rpm"),
            gear_deflection: MotionParameter::new(
                MDL_GEAR_DEFL_TIME,
                model.gear_deflection.max(0.01),
                0.0,
                false,
            )
            .named("gear_deflection"),
            thrust: 0.0,
            lights: LightState {
                pattern: model.light_pattern,
                ..Default::default()
            },
            tire_deg: 0.0,
            prop_rpm: 0.0,
            prop_deg: 0.0,
            light_offset,
        }
    }

    /// Apply one phase side effect. Commands that concern attitude or the
    /// trajectory itself are not handled here.
    pub fn apply(&mut self, cmd: SurfaceCommand, tick: &TickContext) {
        match cmd {
            SurfaceCommand::Thrust(t) => self.thrust = t,
            SurfaceCommand::GearDown => self.gear.to_max(tick),
            SurfaceCommand::GearUp => self.gear.to_min(tick),
            SurfaceCommand::Flaps(sp) => move_to_setpoint(&mut self.flaps, sp, tick),
            SurfaceCommand::Spoilers(sp) => move_to_setpoint(&mut self.spoilers, sp, tick),
            SurfaceCommand::Reversers(sp) => move_to_setpoint(&mut self.reversers, sp, tick),
            SurfaceCommand::GearDeflection(sp) => {
                move_to_setpoint(&mut self.gear_deflection, sp, tick)
            }
            SurfaceCommand::RecoverGearDeflection => {
                if self.gear_deflection.is_max() {
                    self.gear_deflection.to_min(tick);
                }
            }
            SurfaceCommand::TireSpinDown => {
                if self.gear.is_max() {
                    self.tire_rpm.to_min(tick);
                }
            }
            SurfaceCommand::Light(kind, on) => {
                let l = &mut self.lights;
                match kind {
                    LightKind::Taxi => l.taxi = on,
                    LightKind::Landing => l.landing = on,
                    LightKind::Beacon => l.beacon = on,
                    LightKind::Strobe => l.strobe = on,
                    LightKind::Nav => l.nav = on,
                }
            }
            SurfaceCommand::RandomizeLightOffset => self.lights.time_offset = self.light_offset,
            SurfaceCommand::PitchTo(_)
            | SurfaceCommand::RollTo(_)
            | SurfaceCommand::ConsumeRotateTs
            | SurfaceCommand::ForceOnGround => {}
        }
    }

    /// Tires roll with the ground speed.
    pub fn set_tire_rpm_from_speed(&mut self, speed_kn: f64) {
        self.tire_rpm
            .set_val(speed_kn / KT_PER_M_PER_S * 60.0 / MDL_TIRE_CF_M);
    }

    /// Current gear compression (m).
    pub fn deflection(&mut self, tick: &TickContext) -> f64 {
        self.gear_deflection.get(tick)
    }

    /// Advance every animation by one tick and read the result.
    pub fn animate(&mut self, tick: &TickContext, model: &FlightModel, has_rotor: bool) -> SurfacesSnapshot {
        let dt = tick.diff_time.max(0.0);

        self.prop_rpm = if has_rotor {
            model.prop_rpm_max
        } else {
            let half = model.prop_rpm_max / 2.0;
            half + self.thrust.abs() * half
        };
        self.prop_deg = spin(self.prop_deg, self.prop_rpm, dt);

        let tire_rpm = self.tire_rpm.get(tick);
        self.tire_deg = spin(self.tire_deg, tire_rpm, dt);

        SurfacesSnapshot {
            gear: self.gear.get(tick),
            flaps: self.flaps.get(tick),
            spoilers: self.spoilers.get(tick),
            reversers: self.reversers.get(tick),
            thrust: self.thrust,
            tire_rpm,
            tire_deg: self.tire_deg,
            prop_rpm: self.prop_rpm,
            prop_deg: self.prop_deg,
            touch_down: self.reversers.is_increase() && self.reversers.in_motion(tick),
            lights: self.lights.mask(),
        }
    }
}

fn move_to_setpoint(p: &mut MotionParameter, sp: Setpoint, tick: &TickContext) {
    match sp {
        Setpoint::Min => p.to_min(tick),
        Setpoint::Half => p.to_half(tick),
        Setpoint::Max => p.to_max(tick),
    }
}

/// Rotation angle after turning at `rpm` for `dt` seconds.
fn spin(deg: f64, rpm: f64, dt: f64) -> f64 {
    (deg + rpm / 60.0 * dt * 360.0) % 360.0
}
