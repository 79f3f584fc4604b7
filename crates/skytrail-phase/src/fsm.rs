//! Flight phase state machine.
//!
//! Pure functions that classify an aircraft's kinematic state into a
//! [`FlightPhase`] and list the surface setpoints that go with it. No ECS
//! dependency; operates on plain data.
//!
//! Classification evaluates a fixed list of independent conditions in
//! order and the **last matching condition wins**. Conditions overlap on
//! purpose so that noisy or missing telemetry still ends in a sensible
//! phase; testers should read the list in [`classify`] top to bottom.

use skytrail_core::constants::MDL_CLOSE_TO_GND;
use skytrail_core::enums::FlightPhase;

use crate::profiles::FlightModel;

/// Input to the phase FSM for a single aircraft.
pub struct PhaseContext<'a> {
    pub model: &'a FlightModel,
    /// Phase of the previous tick.
    pub phase: FlightPhase,
    /// Ground flag of the previous tick.
    pub was_on_ground: bool,
    /// Ground flag of the rendered position.
    pub pos_on_ground: bool,
    /// Ground flag of the waypoint being flown to.
    pub to_on_ground: bool,
    /// Height above ground (ft).
    pub height_ft: f64,
    /// Altitude above sea level (ft).
    pub alt_ft: f64,
    /// Vertical speed (ft/min).
    pub vsi_ft: f64,
    /// Ground speed (kn).
    pub speed_kn: f64,
    pub speed_is_zero: bool,
    /// The buffer holds an invented stop waypoint.
    pub artificial: bool,
    /// Time the provider expects the aircraft to rotate.
    pub rotate_ts: Option<f64>,
    pub sim_time: f64,
    /// Landing lights stay on while taxiing.
    pub landing_lights_taxi: bool,
}

/// Vertical direction derived from vsi and the model's stable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertDir {
    Sinking,
    Stable,
    Climbing,
}

/// Discrete targets for animated surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setpoint {
    Min,
    Half,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Taxi,
    Landing,
    Beacon,
    Strobe,
    Nav,
}

/// One side effect of the phase decision, applied in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceCommand {
    Thrust(f64),
    GearDown,
    GearUp,
    Flaps(Setpoint),
    Spoilers(Setpoint),
    Reversers(Setpoint),
    GearDeflection(Setpoint),
    /// Start returning the gear deflection once it is fully compressed.
    RecoverGearDeflection,
    /// Let the tires spin down if the gear is down.
    TireSpinDown,
    Light(LightKind, bool),
    RandomizeLightOffset,
    PitchTo(f64),
    RollTo(f64),
    ConsumeRotateTs,
    ForceOnGround,
}

/// Output from the phase FSM.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseUpdate {
    pub phase: FlightPhase,
    pub on_ground: bool,
    pub phase_changed: bool,
    /// Phases entered this tick, in flight order.
    pub entered: Vec<FlightPhase>,
    pub commands: Vec<SurfaceCommand>,
}

/// Evaluate the FSM for one aircraft.
pub fn evaluate(ctx: &PhaseContext) -> PhaseUpdate {
    let model = ctx.model;
    let prev = ctx.phase;

    let on_ground = is_on_ground(ctx);
    let (height, dir) = if on_ground {
        (0.0, VertDir::Stable)
    } else {
        (ctx.height_ft, vert_dir(ctx.vsi_ft, model))
    };

    let phase = classify(ctx, on_ground, height, dir);
    let entered = entered_phases(prev, phase);

    let mut commands = Vec::new();
    for ph in &entered {
        entry_commands(*ph, phase, ctx, &mut commands);
    }
    // climbing again without passing through lower phases (go-around)
    if phase == FlightPhase::Climb && !entered.contains(&FlightPhase::Climb) {
        climb_commands(&mut commands);
    }

    commands.push(SurfaceCommand::RecoverGearDeflection);

    if (phase >= FlightPhase::RollOut || phase == FlightPhase::Taxi)
        && ctx.speed_kn < model.min_reverse_speed
    {
        commands.push(SurfaceCommand::Thrust(0.1));
        commands.push(SurfaceCommand::Reversers(Setpoint::Min));
    }

    landing_light_commands(ctx, phase, &mut commands);
    safety_commands(ctx, phase, on_ground, &mut commands);

    PhaseUpdate {
        phase,
        on_ground,
        phase_changed: phase != prev,
        entered,
        commands,
    }
}

/// On ground if both the rendered position and the next waypoint are,
/// otherwise if very close to the terrain.
pub fn is_on_ground(ctx: &PhaseContext) -> bool {
    if ctx.pos_on_ground && ctx.to_on_ground {
        true
    } else {
        ctx.height_ft <= MDL_CLOSE_TO_GND
    }
}

pub fn vert_dir(vsi_ft: f64, model: &FlightModel) -> VertDir {
    if vsi_ft < -model.vsi_stable {
        VertDir::Sinking
    } else if vsi_ft > model.vsi_stable {
        VertDir::Climbing
    } else {
        VertDir::Stable
    }
}

/// The ordered rule list. Every rule that matches overwrites the result of
/// the rules before it.
pub fn classify(ctx: &PhaseContext, on_ground: bool, height: f64, dir: VertDir) -> FlightPhase {
    let m = ctx.model;
    let prev = ctx.phase;
    let kt = ctx.speed_kn;
    let mut phase = prev;

    // slow on the ground: taxiing, or stopped after an invented roll-out
    if on_ground && kt <= m.max_taxi_speed {
        if !ctx.artificial {
            phase = FlightPhase::Taxi;
        } else if ctx.speed_is_zero {
            phase = FlightPhase::StoppedOnRunway;
        }
    }

    if on_ground && kt > m.max_taxi_speed {
        phase = if prev <= FlightPhase::LiftOff {
            FlightPhase::TakeOffRoll
        } else {
            FlightPhase::RollOut
        };
    }

    if let Some(rotate_ts) = ctx.rotate_ts {
        if phase < FlightPhase::Rotate
            && rotate_ts <= ctx.sim_time
            && ctx.sim_time <= rotate_ts + 2.0 * m.rotate_time
        {
            phase = FlightPhase::Rotate;
        }
    }

    if ctx.was_on_ground && !on_ground && prev != FlightPhase::Unknown {
        phase = FlightPhase::LiftOff;
    }

    if dir == VertDir::Climbing && height < m.agl_gear_up {
        phase = FlightPhase::LiftOff;
    }

    if dir == VertDir::Climbing && height >= m.agl_gear_up {
        phase = FlightPhase::InitialClimb;
    }

    if dir == VertDir::Climbing && height >= m.agl_gear_up && kt >= m.flaps_up_speed {
        phase = FlightPhase::Climb;
    }

    // levelling off below cruise height keeps the climb phase
    if dir == VertDir::Stable && height >= m.cruise_height {
        phase = FlightPhase::Cruise;
    }

    if dir == VertDir::Sinking && kt > m.flaps_down_speed {
        phase = FlightPhase::Descend;
    }

    if dir == VertDir::Sinking && kt <= m.flaps_down_speed {
        phase = FlightPhase::Approach;
    }

    if dir == VertDir::Sinking && kt <= m.flaps_down_speed && height <= m.agl_gear_down {
        phase = FlightPhase::Final;
    }

    if dir == VertDir::Sinking && kt <= m.flaps_down_speed && height <= m.agl_flare {
        phase = FlightPhase::Flare;
    }

    if !ctx.was_on_ground && on_ground && prev != FlightPhase::Unknown {
        phase = FlightPhase::TouchDown;
    }

    // most likely level flight below cruise height
    if phase == FlightPhase::Unknown {
        phase = FlightPhase::Cruise;
    }

    phase
}

/// Phases entered (or skipped over) going from `prev` to `phase`, in
/// flight order. A fresh aircraft starts at `Unknown`, so its first
/// evaluation enters every phase up to the current one.
pub fn entered_phases(prev: FlightPhase, phase: FlightPhase) -> Vec<FlightPhase> {
    FlightPhase::ALL
        .iter()
        .copied()
        .filter(|ph| prev < *ph && phase >= *ph)
        .collect()
}

fn entry_commands(
    entered: FlightPhase,
    phase: FlightPhase,
    ctx: &PhaseContext,
    out: &mut Vec<SurfaceCommand>,
) {
    use SurfaceCommand::*;

    match entered {
        FlightPhase::Taxi => out.extend([
            Thrust(0.1),
            RandomizeLightOffset,
            Light(LightKind::Landing, ctx.landing_lights_taxi),
            Light(LightKind::Taxi, true),
            Light(LightKind::Beacon, true),
            Light(LightKind::Strobe, false),
            Light(LightKind::Nav, true),
            GearDown,
            Flaps(Setpoint::Min),
        ]),
        FlightPhase::TakeOffRoll => out.extend([
            Light(LightKind::Strobe, true),
            Light(LightKind::Landing, true),
            Thrust(1.0),
            Flaps(Setpoint::Half),
        ]),
        // nose up only when exactly rotating, later phases don't undo it
        FlightPhase::Rotate => {
            if phase == FlightPhase::Rotate {
                out.push(PitchTo(ctx.model.pitch_max));
            }
        }
        FlightPhase::LiftOff => out.push(TireSpinDown),
        FlightPhase::InitialClimb => out.extend([GearUp, ConsumeRotateTs]),
        FlightPhase::Climb => climb_commands(out),
        FlightPhase::Cruise => out.extend([Thrust(0.6), Flaps(Setpoint::Min)]),
        FlightPhase::Descend => out.extend([Thrust(0.1), Flaps(Setpoint::Min)]),
        FlightPhase::Approach => out.extend([Thrust(0.2), Flaps(Setpoint::Half)]),
        FlightPhase::Final => out.extend([
            Light(LightKind::Taxi, true),
            Light(LightKind::Landing, true),
            Thrust(0.3),
            Flaps(Setpoint::Max),
            GearDown,
        ]),
        FlightPhase::Flare => out.extend([PitchTo(ctx.model.pitch_flare), RollTo(0.0)]),
        FlightPhase::TouchDown => out.extend([
            GearDeflection(Setpoint::Max),
            Spoilers(Setpoint::Max),
            ForceOnGround,
            PitchTo(0.0),
        ]),
        FlightPhase::RollOut => out.extend([Thrust(-0.9), Reversers(Setpoint::Max)]),
        FlightPhase::Unknown | FlightPhase::StoppedOnRunway => {}
    }
}

fn climb_commands(out: &mut Vec<SurfaceCommand>) {
    out.extend([
        SurfaceCommand::Light(LightKind::Taxi, false),
        SurfaceCommand::Thrust(0.8),
        SurfaceCommand::GearUp,
        SurfaceCommand::Flaps(Setpoint::Min),
    ]);
}

fn landing_light_commands(ctx: &PhaseContext, phase: FlightPhase, out: &mut Vec<SurfaceCommand>) {
    let ll_alt = ctx.model.light_ll_alt;
    if ll_alt <= 0.0 {
        return;
    }
    if ctx.alt_ft > ll_alt {
        if phase < FlightPhase::TakeOffRoll
            || (FlightPhase::Climb <= phase && phase < FlightPhase::Final)
        {
            out.push(SurfaceCommand::Light(LightKind::Landing, false));
        }
    } else if phase >= FlightPhase::TakeOffRoll {
        out.push(SurfaceCommand::Light(LightKind::Landing, true));
    }
}

fn safety_commands(
    ctx: &PhaseContext,
    phase: FlightPhase,
    on_ground: bool,
    out: &mut Vec<SurfaceCommand>,
) {
    if on_ground {
        out.push(SurfaceCommand::GearDown);
    }

    if matches!(phase, FlightPhase::Taxi | FlightPhase::StoppedOnRunway) {
        out.extend([
            SurfaceCommand::Flaps(Setpoint::Min),
            SurfaceCommand::Spoilers(Setpoint::Min),
            SurfaceCommand::Thrust(0.1),
            SurfaceCommand::Reversers(Setpoint::Min),
            SurfaceCommand::Light(LightKind::Taxi, true),
            SurfaceCommand::Light(LightKind::Landing, ctx.landing_lights_taxi),
            SurfaceCommand::Light(LightKind::Strobe, false),
        ]);
    }
}
