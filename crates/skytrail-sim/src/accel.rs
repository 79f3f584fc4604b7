//! AccelParameter: ground speed with constant-acceleration ramps.
//!
//! Positions are known at fixed timestamps, speeds in between are not. A
//! linear speed ramp between two speeds covers the same distance as flying
//! their average, so a leg can change speed and still arrive on time. The
//! fraction of a leg's distance covered so far ([`AccelParameter::get_ratio`])
//! then replaces the plain time fraction when interpolating positions.

use skytrail_core::constants::KT_PER_M_PER_S;
use skytrail_core::types::dequal;

/// A speed profile: constant `start_speed` until `accel_start_ts`, then a
/// linear ramp reaching `target_speed` at `target_ts`, constant after.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    start_speed: f64,
    target_speed: f64,
    accel: f64,
    target_delta_dist: f64,
    start_ts: f64,
    accel_start_ts: f64,
    target_ts: f64,
}

impl Ramp {
    fn speed_at(&self, ts: f64) -> f64 {
        if ts < self.accel_start_ts {
            self.start_speed
        } else if ts >= self.target_ts {
            self.target_speed
        } else {
            self.accel.mul_add(ts - self.accel_start_ts, self.start_speed)
        }
    }

    /// Distance covered since `start_ts`: d(t) = v0·t + ½·a·t² over the ramp.
    fn delta_dist(&self, ts: f64) -> f64 {
        let mut dist = self.start_speed * (self.accel_start_ts.min(ts) - self.start_ts);
        if ts > self.accel_start_ts {
            let dt = ts.min(self.target_ts) - self.accel_start_ts;
            dist += dt * (self.accel / 2.0).mul_add(dt, self.start_speed);
        }
        if ts > self.target_ts {
            dist += (ts - self.target_ts) * self.target_speed;
        }
        dist
    }
}

/// Speed in m/s, constant or ramping.
#[derive(Debug, Clone, Default)]
pub struct AccelParameter {
    speed: f64,
    ramp: Option<Ramp>,
}

impl AccelParameter {
    /// Fly a constant speed.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
        self.ramp = None;
    }

    /// Ramp from `start` to `target` at `accel` m/s², beginning at `start_ts`.
    ///
    /// `accel` must point from `start` toward `target`; otherwise the speed
    /// simply becomes `target`.
    pub fn start_accel(&mut self, start: f64, target: f64, accel: f64, start_ts: f64) {
        let consistent = if accel > 0.0 {
            target > start
        } else {
            accel < 0.0 && target < start
        };
        if !consistent {
            self.set_speed(target);
            return;
        }

        self.set_speed(start);
        let mut ramp = Ramp {
            start_speed: start,
            target_speed: target,
            accel,
            target_delta_dist: 0.0,
            start_ts,
            accel_start_ts: start_ts,
            target_ts: start_ts + (target - start) / accel,
        };
        ramp.target_delta_dist = ramp.delta_dist(ramp.target_ts);
        self.ramp = Some(ramp);
    }

    /// Plan a speed profile over `[start_ts, target_ts]` that begins near
    /// `start`, ends at `target`, and covers exactly `delta_dist`.
    ///
    /// The profile holds a constant lead-in speed, then ramps linearly. This
    /// only works if `start` and `target` lie on opposite sides of the leg's
    /// average speed; a start speed further out than the target's mirror
    /// image is pulled in to that mirror image. If both lie on the same side
    /// the average speed is flown instead. A leg with no distance or no
    /// duration just takes the target speed.
    pub fn start_speed_control(
        &mut self,
        start: f64,
        target: f64,
        delta_dist: f64,
        start_ts: f64,
        target_ts: f64,
    ) {
        let delta_time = target_ts - start_ts;
        if dequal(delta_dist, 0.0) || dequal(delta_time, 0.0) {
            self.set_speed(target);
            return;
        }
        let avg = delta_dist / delta_time;

        let start = if start > avg && avg > target {
            start.min(avg + (avg - target))
        } else if start < avg && avg < target {
            start.max(avg - (target - avg))
        } else {
            self.set_speed(avg);
            return;
        };

        // time at which the ramp must begin, from the first moment of the
        // profile: tx = 2/Δv · (v0·Δt + Δv/2·tt − d)
        let delta_speed = target - start;
        let tx = 2.0 / delta_speed * (start * delta_time + delta_speed / 2.0 * target_ts - delta_dist);
        let accel = delta_speed / (target_ts - tx);
        if !accel.is_finite() || tx > target_ts {
            self.set_speed(avg);
            return;
        }

        self.set_speed(start);
        self.ramp = Some(Ramp {
            start_speed: start,
            target_speed: target,
            accel,
            target_delta_dist: delta_dist,
            start_ts,
            accel_start_ts: tx.max(start_ts),
            target_ts,
        });
    }

    /// Recompute the current speed for `ts` and return it (m/s).
    pub fn update_speed(&mut self, ts: f64) -> f64 {
        if let Some(ramp) = &self.ramp {
            self.speed = ramp.speed_at(ts);
        }
        self.speed
    }

    /// Distance covered since the ramp's start time, `None` at constant
    /// speed.
    pub fn get_delta_dist(&self, ts: f64) -> Option<f64> {
        self.ramp.map(|r| r.delta_dist(ts))
    }

    /// Share of the planned distance covered at `ts`, `None` at constant
    /// speed or when no distance was planned.
    pub fn get_ratio(&self, ts: f64) -> Option<f64> {
        self.ramp
            .filter(|r| !dequal(r.target_delta_dist, 0.0))
            .map(|r| r.delta_dist(ts) / r.target_delta_dist)
    }

    pub fn is_changing(&self) -> bool {
        self.ramp.is_some()
    }

    pub fn is_zero(&self) -> bool {
        self.speed <= 0.0
    }

    /// Current speed (m/s) as of the last update.
    pub fn m_s(&self) -> f64 {
        self.speed
    }

    pub fn kt(&self) -> f64 {
        self.speed * KT_PER_M_PER_S
    }

    pub fn target_time(&self) -> Option<f64> {
        self.ramp.map(|r| r.target_ts)
    }

    pub fn target_delta_dist(&self) -> Option<f64> {
        self.ramp.map(|r| r.target_delta_dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_set_speed_is_constant() {
        let mut s = AccelParameter::default();
        s.set_speed(50.0);
        assert!(!s.is_changing());
        assert_eq!(s.update_speed(1000.0), 50.0);
        assert!(approx(s.kt(), 50.0 * KT_PER_M_PER_S));
        assert_eq!(s.get_ratio(10.0), None);
    }

    #[test]
    fn test_start_accel_deceleration_to_stop() {
        let mut s = AccelParameter::default();
        s.start_accel(10.0, 0.0, -2.0, 100.0);
        assert_eq!(s.target_time(), Some(105.0));
        // 10 m/s to 0 over 5 s: 25 m
        assert!(approx(s.target_delta_dist().unwrap(), 25.0));
        assert!(approx(s.update_speed(102.5), 5.0));
        assert_eq!(s.update_speed(105.0), 0.0);
        assert!(s.is_zero());
        assert!(approx(s.get_ratio(105.0).unwrap(), 1.0));
        assert!(approx(s.get_ratio(200.0).unwrap(), 1.0), "no distance after stop");
    }

    #[test]
    fn test_start_accel_inconsistent_direction_sets_target() {
        let mut s = AccelParameter::default();
        s.start_accel(10.0, 0.0, 2.0, 0.0);
        assert!(!s.is_changing());
        assert_eq!(s.m_s(), 0.0);
    }

    #[test]
    fn test_speed_control_decelerating_covers_distance() {
        let mut s = AccelParameter::default();
        // avg 100 m/s over 10s, 105 -> 90 with a constant lead-in
        s.start_speed_control(105.0, 90.0, 1000.0, 0.0, 10.0);
        assert!(s.is_changing());
        assert!(approx(s.get_delta_dist(10.0).unwrap(), 1000.0));
        assert!(approx(s.get_ratio(10.0).unwrap(), 1.0));
        assert_eq!(s.update_speed(-1.0), 105.0);
        assert_eq!(s.update_speed(3.0), 105.0);
        assert_eq!(s.update_speed(10.0), 90.0);
        assert_eq!(s.update_speed(11.0), 90.0);
    }

    #[test]
    fn test_speed_control_accelerating_covers_distance() {
        let mut s = AccelParameter::default();
        s.start_speed_control(95.0, 110.0, 1000.0, 50.0, 60.0);
        assert!(approx(s.get_delta_dist(60.0).unwrap(), 1000.0));
        assert_eq!(s.update_speed(50.0), 95.0);
        assert_eq!(s.update_speed(60.0), 110.0);
    }

    #[test]
    fn test_speed_control_clamps_start_to_mirror() {
        let mut s = AccelParameter::default();
        // avg 100, target 90 -> start may be at most 110
        s.start_speed_control(200.0, 90.0, 1000.0, 0.0, 10.0);
        assert_eq!(s.update_speed(0.0), 110.0);
        assert!(approx(s.get_delta_dist(10.0).unwrap(), 1000.0));
        // mirrored start ramps over the whole leg
        assert!(approx(s.update_speed(5.0), 100.0));
    }

    #[test]
    fn test_speed_control_same_side_flies_average() {
        let mut s = AccelParameter::default();
        s.start_speed_control(120.0, 130.0, 1000.0, 0.0, 10.0);
        assert!(!s.is_changing());
        assert_eq!(s.m_s(), 100.0);
    }

    #[test]
    fn test_speed_control_degenerate_takes_target() {
        let mut s = AccelParameter::default();
        s.start_speed_control(120.0, 30.0, 0.0, 0.0, 10.0);
        assert!(!s.is_changing());
        assert_eq!(s.m_s(), 30.0);
    }

    #[test]
    fn test_ratio_monotonic_over_leg() {
        let mut s = AccelParameter::default();
        s.start_speed_control(60.0, 40.0, 500.0, 0.0, 10.0);
        let mut prev = -1.0;
        for i in 0..=20 {
            let r = s.get_ratio(i as f64 * 0.5).unwrap();
            assert!(r > prev);
            prev = r;
        }
        assert!(approx(prev, 1.0));
    }
}
