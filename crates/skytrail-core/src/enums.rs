//! Enumeration types used throughout the trajectory engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Flight phase of a tracked aircraft.
///
/// Variants are declared in flight order and compare by that order, so
/// `phase >= FlightPhase::TouchDown` means "touched down or later".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FlightPhase {
    #[default]
    Unknown,
    Taxi,
    TakeOffRoll,
    Rotate,
    LiftOff,
    InitialClimb,
    Climb,
    Cruise,
    Descend,
    Approach,
    Final,
    Flare,
    TouchDown,
    RollOut,
    StoppedOnRunway,
}

impl FlightPhase {
    /// All phases in flight order.
    pub const ALL: [FlightPhase; 15] = [
        FlightPhase::Unknown,
        FlightPhase::Taxi,
        FlightPhase::TakeOffRoll,
        FlightPhase::Rotate,
        FlightPhase::LiftOff,
        FlightPhase::InitialClimb,
        FlightPhase::Climb,
        FlightPhase::Cruise,
        FlightPhase::Descend,
        FlightPhase::Approach,
        FlightPhase::Final,
        FlightPhase::Flare,
        FlightPhase::TouchDown,
        FlightPhase::RollOut,
        FlightPhase::StoppedOnRunway,
    ];

    /// True while rolling, stopped or taxiing on the ground.
    pub fn is_ground_phase(self) -> bool {
        matches!(
            self,
            FlightPhase::Taxi
                | FlightPhase::TakeOffRoll
                | FlightPhase::TouchDown
                | FlightPhase::RollOut
                | FlightPhase::StoppedOnRunway
        )
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            FlightPhase::Unknown => "",
            FlightPhase::Taxi => "Taxi",
            FlightPhase::TakeOffRoll => "Take Off Roll",
            FlightPhase::Rotate => "Rotate",
            FlightPhase::LiftOff => "Lift Off",
            FlightPhase::InitialClimb => "Initial Climb",
            FlightPhase::Climb => "Climb",
            FlightPhase::Cruise => "Cruise",
            FlightPhase::Descend => "Descend",
            FlightPhase::Approach => "Approach",
            FlightPhase::Final => "Final",
            FlightPhase::Flare => "Flare",
            FlightPhase::TouchDown => "Touch Down",
            FlightPhase::RollOut => "Roll Out",
            FlightPhase::StoppedOnRunway => "Stopped",
        }
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a non-blocking request to the flight data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchResult {
    /// New data was handed over.
    Success,
    /// Nothing new available yet.
    NoData,
    /// The data access lock is held elsewhere; retry next tick.
    NoLock,
    /// The provider failed internally.
    TechError,
}

/// A provider answer that carries a value on success.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fetch<T> {
    Ready(T),
    NoData,
    NoLock,
    TechError,
}

impl<T> Fetch<T> {
    /// The status part of the answer.
    pub fn status(&self) -> FetchResult {
        match self {
            Fetch::Ready(_) => FetchResult::Success,
            Fetch::NoData => FetchResult::NoData,
            Fetch::NoLock => FetchResult::NoLock,
            Fetch::TechError => FetchResult::TechError,
        }
    }

    /// Transform the carried value, keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
        match self {
            Fetch::Ready(v) => Fetch::Ready(f(v)),
            Fetch::NoData => Fetch::NoData,
            Fetch::NoLock => Fetch::NoLock,
            Fetch::TechError => Fetch::TechError,
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Fetch::Ready(v) => Some(v),
            _ => None,
        }
    }
}

/// Light flash pattern of an aircraft model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightPattern {
    /// Jet airliner: beacon and strobes in separate rhythms.
    #[default]
    Default,
    /// Airbus double-flash strobes.
    Airbus,
    /// General aviation single flash.
    GeneralAviation,
}

impl LightPattern {
    /// Map the numeric model file value (0..=2).
    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(LightPattern::Default),
            1 => Some(LightPattern::Airbus),
            2 => Some(LightPattern::GeneralAviation),
            _ => None,
        }
    }
}
