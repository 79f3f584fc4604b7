//! MotionParameter: a bounded scalar that moves linearly over simulated time.
//!
//! Used for everything that takes a while to change: gear, flaps, pitch,
//! bank, and heading (which wraps around at 360).

use tracing::debug;

use skytrail_core::types::{dequal, TickContext};

/// A scheduled linear move.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Motion {
    from_val: f64,
    to_val: f64,
    /// Signed distance travelled, including any wrap-around.
    dist: f64,
    from_ts: f64,
    to_ts: f64,
}

#[derive(Debug, Clone)]
pub struct MotionParameter {
    name: &'static str,
    min: f64,
    max: f64,
    /// Seconds for a full travel from `min` to `max`.
    pub def_duration: f64,
    wrap: bool,
    increase: bool,
    val: f64,
    motion: Option<Motion>,
}

impl MotionParameter {
    /// A parameter in `[min, max]` starting at `min`.
    ///
    /// With `wrap` set the value lives in `[min, max)` and moves may pass
    /// through the seam, as a heading does at north.
    pub fn new(def_duration: f64, max: f64, min: f64, wrap: bool) -> Self {
        debug_assert!(max > min, "motion range must not be empty");
        Self {
            name: "",
            min,
            max,
            def_duration: def_duration.max(0.0),
            wrap,
            increase: true,
            val: min,
            motion: None,
        }
    }

    /// A `0..1` ratio, e.g. gear or flaps extension.
    pub fn ratio(def_duration: f64) -> Self {
        Self::new(def_duration, 1.0, 0.0, false)
    }

    /// Name used in trace output.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Bring a value into the parameter's domain.
    fn fit(&self, v: f64) -> f64 {
        if self.wrap {
            let n = (v - self.min).rem_euclid(self.range()) + self.min;
            if n >= self.max {
                self.min
            } else {
                n
            }
        } else {
            v.clamp(self.min, self.max)
        }
    }

    /// Set immediately, cancelling any scheduled move.
    pub fn set_val(&mut self, v: f64) {
        self.val = self.fit(v);
        self.motion = None;
    }

    /// Currently between start and end of a move.
    pub fn in_motion(&self, tick: &TickContext) -> bool {
        let now = tick.sim_time;
        self.motion
            .is_some_and(|m| m.from_ts <= now && now <= m.to_ts)
    }

    /// A move is scheduled or running.
    pub fn is_programmed(&self, tick: &TickContext) -> bool {
        self.motion.is_some_and(|m| tick.sim_time <= m.to_ts)
    }

    /// Move toward `target` at the default rate, starting at `start_ts`
    /// (default: now).
    ///
    /// Calling again with the same target while the move is pending does
    /// not restart it.
    pub fn move_to(&mut self, target: f64, start_ts: Option<f64>, tick: &TickContext) {
        let target = self.fit(target);
        if dequal(target, self.val) {
            self.set_val(target);
            return;
        }
        if self.motion.is_some_and(|m| dequal(m.to_val, target)) {
            return;
        }

        let dist = target - self.val;
        let from_ts = start_ts.unwrap_or(tick.sim_time);
        self.increase = dist > 0.0;
        self.motion = Some(Motion {
            from_val: self.val,
            to_val: target,
            dist,
            from_ts,
            to_ts: (dist / self.range()).abs().mul_add(self.def_duration, from_ts),
        });
    }

    /// Move from `from` (default: current value) to `to`, arriving no later
    /// than `by_ts`.
    ///
    /// `increase` picks the direction; if it disagrees with the plain sign of
    /// `to - from` the move wraps around. The default-rate duration is
    /// compressed when the window is too short. With `start_early` the move
    /// begins at `start_ts` (default: now), otherwise it starts as late as
    /// possible and ends exactly at `by_ts`.
    #[allow(clippy::too_many_arguments)]
    pub fn move_to_by(
        &mut self,
        from: Option<f64>,
        increase: bool,
        to: f64,
        start_ts: Option<f64>,
        by_ts: f64,
        start_early: bool,
        tick: &TickContext,
    ) {
        let to = self.fit(to);
        if dequal(to, self.val) {
            self.set_val(to);
            return;
        }
        if self.motion.is_some_and(|m| dequal(m.to_val, to)) {
            return;
        }

        let now = tick.sim_time;
        if by_ts <= now {
            debug!(
                parameter = self.name,
                target = to,
                by_ts,
                now,
                "motion deadline already passed, jumping to target"
            );
            self.set_val(to);
            return;
        }

        let from = from.map_or(self.val, |f| self.fit(f));
        let mut start_ts = start_ts.unwrap_or(now);
        if start_ts >= by_ts {
            start_ts = now;
        }

        let direct = (increase && from < to) || (!increase && from > to);
        let dist = if direct || !self.wrap {
            to - from
        } else if increase {
            to - from + self.range()
        } else {
            to - from - self.range()
        };
        self.increase = dist > 0.0;

        let time_dist = (dist / self.range() * self.def_duration)
            .abs()
            .min(by_ts - start_ts);

        let (from_ts, to_ts) = if start_early {
            self.val = from;
            (start_ts, start_ts + time_dist)
        } else {
            (by_ts - time_dist, by_ts)
        };
        self.motion = Some(Motion {
            from_val: from,
            to_val: to,
            dist,
            from_ts,
            to_ts,
        });
    }

    /// Like [`move_to_by`](Self::move_to_by), going the shorter way round.
    pub fn move_quickest_to_by(
        &mut self,
        from: Option<f64>,
        to: f64,
        start_ts: Option<f64>,
        by_ts: f64,
        start_early: bool,
        tick: &TickContext,
    ) {
        let from_v = from.map_or(self.val, |f| self.fit(f));
        let to = self.fit(to);
        let increase = if !self.wrap || (to - from_v).abs() <= self.range() / 2.0 {
            from_v <= to
        } else {
            to < from_v
        };
        self.move_to_by(Some(from_v), increase, to, start_ts, by_ts, start_early, tick);
    }

    /// Current value. Commits the target once the move's end time is
    /// reached.
    pub fn get(&mut self, tick: &TickContext) -> f64 {
        let now = tick.sim_time;
        if let Some(m) = self.motion {
            if now >= m.to_ts {
                self.set_val(m.to_val);
            } else if m.from_ts <= now {
                let f = (now - m.from_ts) / (m.to_ts - m.from_ts);
                self.val = self.fit(f.mul_add(m.dist, m.from_val));
            }
        }
        self.val
    }

    // --- shorthand moves ---

    pub fn to_min(&mut self, tick: &TickContext) {
        self.move_to(self.min, None, tick);
    }

    pub fn to_max(&mut self, tick: &TickContext) {
        self.move_to(self.max, None, tick);
    }

    pub fn to_half(&mut self, tick: &TickContext) {
        self.move_to((self.min + self.max) / 2.0, None, tick);
    }

    // --- state without advancing ---

    /// Value as of the last `get` or `set_val`.
    pub fn is(&self) -> f64 {
        self.val
    }

    pub fn is_min(&self) -> bool {
        self.val <= self.min
    }

    pub fn is_max(&self) -> bool {
        self.val >= self.max
    }

    pub fn is_increase(&self) -> bool {
        self.increase
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn to_val(&self) -> Option<f64> {
        self.motion.map(|m| m.to_val)
    }

    pub fn from_ts(&self) -> Option<f64> {
        self.motion.map(|m| m.from_ts)
    }

    pub fn to_ts(&self) -> Option<f64> {
        self.motion.map(|m| m.to_ts)
    }
}
