//! Unit conversions and tuning constants shared by the trajectory crates.

/// Default host tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick at the default rate.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

// --- Units ---

/// Meters per foot.
pub const M_PER_FT: f64 = 0.3048;

/// Knots per meter/second.
pub const KT_PER_M_PER_S: f64 = 1.94384;

/// Meters/second per foot/minute.
pub const MS_PER_FTM: f64 = M_PER_FT / 60.0;

/// Mean earth diameter (m), used by the haversine formulas.
pub const EARTH_D_M: f64 = 12_742_000.0;

/// Tolerance for floating point comparisons of model values.
pub const EPSILON: f64 = 0.000_01;

// --- Position buffer ---

/// Seconds before reaching the last buffered waypoint at which new
/// waypoints are fetched. Twice this is the lead (and rate limit) for
/// asking the provider to calculate more.
pub const TIME_REQU_POS: f64 = 0.5;

/// Waypoints closer in time than this are considered duplicates (s).
pub const SIMILAR_TS_INTVL: f64 = 3.0;

/// Vectors shorter than this (m) do not define a reliable heading.
pub const SIMILAR_POS_DIST: f64 = 3.0;

/// Lookahead offset past 'to' when peeking at the next leg (s).
pub const NEXT_VEC_LOOKAHEAD: f64 = 1.0;

// --- Plausibility limits ---

/// Lowest plausible altitude (ft).
pub const MDL_ALT_MIN: f64 = -1500.0;

/// Highest plausible altitude (ft).
pub const MDL_ALT_MAX: f64 = 60_000.0;

/// Height above ground (ft) considered "on ground".
pub const MDL_CLOSE_TO_GND: f64 = 0.5;

// --- Surface animation timing ---

/// Time to open or close the thrust reversers (s).
pub const MDL_REVERSERS_TIME: f64 = 2.0;

/// Time to extend or retract spoilers (s).
pub const MDL_SPOILERS_TIME: f64 = 0.5;

/// Time for tires to stop rotating after lift-off (s).
pub const MDL_TIRE_SLOW_TIME: f64 = 5.0;

/// Maximum tire rotation speed (rpm).
pub const MDL_TIRE_MAX_RPM: f64 = 2000.0;

/// Tire circumference (m), roughly a 40-inch tire.
pub const MDL_TIRE_CF_M: f64 = 3.2;

/// Time for one direction of gear deflection on touch-down (s).
pub const MDL_GEAR_DEFL_TIME: f64 = 0.5;

// --- Terrain probing ---

/// Height-above-ground bands (ft) for terrain probe scheduling.
pub const PROBE_HEIGHT_LIM: [f64; 4] = [5000.0, 1000.0, 500.0, f64::NEG_INFINITY];

/// Delay until the next terrain probe (s), per band in `PROBE_HEIGHT_LIM`.
pub const PROBE_DELAY: [f64; 4] = [10.0, 1.0, 0.5, 0.2];

// --- Engine ---

/// Default buffering period (s). A tick gap longer than this
/// re-initialises all aircraft.
pub const DEFAULT_BUF_PERIOD: f64 = 90.0;

/// Cycles between refreshes of an aircraft's dynamic data.
pub const DYN_DATA_REFRESH_CYCLES: u64 = 100;

/// AI priority reported for hidden aircraft.
pub const HIDDEN_AI_PRIO: u8 = 100;

/// Parking position reported for hidden aircraft (lat, lon, alt m).
pub const AC_HIDE_POS: (f64, f64, f64) = (-70.645077, -8.264134, 50.0);
