//! Flight data provider: where an aircraft's waypoints come from.
//!
//! Waypoints are produced by an ingestion thread and read by the tick
//! thread. The tick thread never blocks: every read is a `try_lock`, and a
//! contended lock means "retry next tick".

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use tracing::{debug, trace};

use skytrail_core::aircraft::{DynamicData, StaticData};
use skytrail_core::constants::SIMILAR_TS_INTVL;
use skytrail_core::enums::{Fetch, FetchResult};
use skytrail_core::errors::{Result, TrajectoryError};
use skytrail_core::types::{GeoVector, Waypoint};

/// Source of waypoints and identification data for one aircraft.
pub trait FlightDataProvider: Send + Sync {
    /// Move new waypoints past the end of `buffer` into it. An empty buffer
    /// receives two waypoints. A pending rotate timestamp is copied into
    /// `rotate_ts` but never cleared.
    fn try_fetch_new_pos(
        &self,
        buffer: &mut VecDeque<Waypoint>,
        rotate_ts: &mut Option<f64>,
    ) -> FetchResult;

    /// Ask for more waypoints from `not_before` on. Never blocks.
    fn trigger_calc_new_pos(&self, not_before: f64);

    /// First queued waypoint at or after `ts`, without removing it.
    fn try_get_next_pos(&self, ts: f64) -> Fetch<Waypoint>;

    /// Vector from `from` to the first queued waypoint at or after `ts`.
    fn try_get_vec(&self, from: &Waypoint, ts: f64) -> Fetch<GeoVector> {
        self.try_get_next_pos(ts).map(|next| from.between(&next))
    }

    fn try_copy_static(&self) -> Fetch<StaticData>;

    fn try_copy_dynamic(&self) -> Fetch<DynamicData>;
}

/// ECS component holding an aircraft's provider.
#[derive(Clone)]
pub struct FeedHandle(pub Arc<dyn FlightDataProvider>);

#[derive(Debug, Default)]
struct FlightData {
    positions: VecDeque<Waypoint>,
    rotate_ts: Option<f64>,
    static_data: StaticData,
    dynamic: DynamicData,
}

/// A provider fed from another thread, guarded by one data access lock.
#[derive(Debug)]
pub struct SharedFlightData {
    key: String,
    data: Mutex<FlightData>,
    /// Latest requested "not before" time of pending calc requests.
    calc_request: Mutex<Option<f64>>,
}

impl SharedFlightData {
    pub fn new(key: impl Into<String>, static_data: StaticData) -> Self {
        Self {
            key: key.into(),
            data: Mutex::new(FlightData {
                static_data,
                ..Default::default()
            }),
            calc_request: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> Result<MutexGuard<'_, FlightData>> {
        self.data.lock().map_err(|_| TrajectoryError::LockPoisoned)
    }

    /// Non-blocking lock for the tick thread.
    fn try_lock(&self) -> std::result::Result<MutexGuard<'_, FlightData>, FetchResult> {
        match self.data.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(FetchResult::NoLock),
            Err(TryLockError::Poisoned(_)) => Err(FetchResult::TechError),
        }
    }

    /// Insert a waypoint in timestamp order. Returns `false` if a queued
    /// waypoint lies within [`SIMILAR_TS_INTVL`] of it.
    pub fn add_waypoint(&self, wp: Waypoint) -> Result<bool> {
        let mut data = self.lock()?;
        if data
            .positions
            .iter()
            .any(|p| (p.ts - wp.ts).abs() < SIMILAR_TS_INTVL)
        {
            trace!(aircraft = %self.key, ts = wp.ts, "waypoint too close to a queued one, dropped");
            return Ok(false);
        }
        let idx = data.positions.partition_point(|p| p.ts < wp.ts);
        data.positions.insert(idx, wp);
        Ok(true)
    }

    /// Time at which the aircraft is expected to rotate for take-off.
    pub fn set_rotate_ts(&self, ts: f64) -> Result<()> {
        self.lock()?.rotate_ts = Some(ts);
        Ok(())
    }

    pub fn set_static(&self, static_data: StaticData) -> Result<()> {
        self.lock()?.static_data = static_data;
        Ok(())
    }

    pub fn set_dynamic(&self, dynamic: DynamicData) -> Result<()> {
        self.lock()?.dynamic = dynamic;
        Ok(())
    }

    /// Run `f` on the queued waypoints under the data access lock, e.g. to
    /// snap them to the ground.
    pub fn with_positions_mut<R>(&self, f: impl FnOnce(&mut VecDeque<Waypoint>) -> R) -> Result<R> {
        let mut data = self.lock()?;
        Ok(f(&mut data.positions))
    }

    /// Number of queued waypoints.
    pub fn queued(&self) -> Result<usize> {
        Ok(self.lock()?.positions.len())
    }

    /// Enough waypoints queued to start flying.
    pub fn ready_for_aircraft(&self) -> Result<bool> {
        Ok(self.queued()? >= 2)
    }

    /// Take the pending calc request, if any.
    pub fn take_calc_request(&self) -> Result<Option<f64>> {
        let mut req = self
            .calc_request
            .lock()
            .map_err(|_| TrajectoryError::LockPoisoned)?;
        Ok(req.take())
    }
}

impl FlightDataProvider for SharedFlightData {
    fn try_fetch_new_pos(
        &self,
        buffer: &mut VecDeque<Waypoint>,
        rotate_ts: &mut Option<f64>,
    ) -> FetchResult {
        let mut data = match self.try_lock() {
            Ok(d) => d,
            Err(status) => return status,
        };

        if buffer.is_empty() {
            if data.positions.len() < 2 {
                return FetchResult::NoData;
            }
            buffer.extend(data.positions.drain(..2));
        } else {
            let last_ts = buffer.back().map_or(f64::NEG_INFINITY, |p| p.ts);
            while data.positions.front().is_some_and(|p| p.ts <= last_ts) {
                data.positions.pop_front();
            }
            match data.positions.pop_front() {
                Some(p) => buffer.push_back(p),
                None => return FetchResult::NoData,
            }
        }

        if let Some(ts) = data.rotate_ts {
            *rotate_ts = Some(ts);
        }
        FetchResult::Success
    }

    fn trigger_calc_new_pos(&self, not_before: f64) {
        // the calc request has its own lock, the data lock may be held by
        // the ingestion thread right now
        match self.calc_request.try_lock() {
            Ok(mut req) => {
                *req = Some(req.map_or(not_before, |t| t.max(not_before)));
            }
            Err(_) => debug!(aircraft = %self.key, "calc request dropped, lock busy"),
        }
    }

    fn try_get_next_pos(&self, ts: f64) -> Fetch<Waypoint> {
        let data = match self.try_lock() {
            Ok(d) => d,
            Err(FetchResult::NoLock) => return Fetch::NoLock,
            Err(_) => return Fetch::TechError,
        };
        match data.positions.iter().find(|p| p.ts >= ts) {
            Some(p) => Fetch::Ready(*p),
            None => Fetch::NoData,
        }
    }

    fn try_copy_static(&self) -> Fetch<StaticData> {
        match self.try_lock() {
            Ok(d) => Fetch::Ready(d.static_data.clone()),
            Err(FetchResult::NoLock) => Fetch::NoLock,
            Err(_) => Fetch::TechError,
        }
    }

    fn try_copy_dynamic(&self) -> Fetch<DynamicData> {
        match self.try_lock() {
            Ok(d) => Fetch::Ready(d.dynamic.clone()),
            Err(FetchResult::NoLock) => Fetch::NoLock,
            Err(_) => Fetch::TechError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(ts: f64) -> Waypoint {
        Waypoint::new(47.0, 8.0 + ts / 1000.0, 1000.0, ts)
    }

    fn feed(ts: &[f64]) -> SharedFlightData {
        let fd = SharedFlightData::new("4b1805", StaticData::default());
        for t in ts {
            assert!(fd.add_waypoint(wp(*t)).unwrap());
        }
        fd
    }

    #[test]
    fn test_add_waypoint_sorted_and_rejects_near_duplicates() {
        let fd = feed(&[20.0, 0.0, 10.0]);
        assert!(!fd.add_waypoint(wp(11.0)).unwrap());
        let order = fd
            .with_positions_mut(|q| q.iter().map(|p| p.ts).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(order, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_fetch_into_empty_buffer_takes_two() {
        let fd = feed(&[0.0, 10.0, 20.0]);
        let mut buf = VecDeque::new();
        let mut rot = None;
        assert_eq!(fd.try_fetch_new_pos(&mut buf, &mut rot), FetchResult::Success);
        assert_eq!(buf.len(), 2);
        assert_eq!(fd.queued().unwrap(), 1);
    }

    #[test]
    fn test_fetch_skips_outdated_and_appends_one() {
        let fd = feed(&[0.0, 10.0, 20.0, 30.0]);
        let mut buf: VecDeque<Waypoint> = [wp(5.0), wp(15.0)].into_iter().collect();
        let mut rot = None;
        assert_eq!(fd.try_fetch_new_pos(&mut buf, &mut rot), FetchResult::Success);
        assert_eq!(buf.back().unwrap().ts, 20.0);
        assert_eq!(fd.queued().unwrap(), 1);
    }

    #[test]
    fn test_fetch_no_data() {
        let fd = feed(&[0.0]);
        let mut buf = VecDeque::new();
        let mut rot = None;
        assert_eq!(fd.try_fetch_new_pos(&mut buf, &mut rot), FetchResult::NoData);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_fetch_no_lock_while_held() {
        let fd = feed(&[0.0, 10.0]);
        let mut buf = VecDeque::new();
        let mut rot = None;
        let status = fd
            .with_positions_mut(|_| fd.try_fetch_new_pos(&mut buf, &mut rot))
            .unwrap();
        assert_eq!(status, FetchResult::NoLock);
        assert!(matches!(
            fd.with_positions_mut(|_| fd.try_get_next_pos(0.0)).unwrap(),
            Fetch::NoLock
        ));
    }

    #[test]
    fn test_rotate_ts_handed_over_not_cleared() {
        let fd = feed(&[0.0, 10.0, 20.0]);
        fd.set_rotate_ts(12.0).unwrap();
        let mut buf = VecDeque::new();
        let mut rot = None;
        fd.try_fetch_new_pos(&mut buf, &mut rot);
        assert_eq!(rot, Some(12.0));
    }

    #[test]
    fn test_calc_request_keeps_latest() {
        let fd = feed(&[]);
        fd.trigger_calc_new_pos(10.0);
        fd.trigger_calc_new_pos(5.0);
        assert_eq!(fd.take_calc_request().unwrap(), Some(10.0));
        assert_eq!(fd.take_calc_request().unwrap(), None);
    }

    #[test]
    fn test_try_get_vec_peeks() {
        let fd = feed(&[0.0, 10.0]);
        let from = wp(-10.0);
        let v = fd.try_get_vec(&from, 5.0).ready().unwrap();
        assert!((v.speed - from.dist_to(&wp(10.0)) / 20.0).abs() < 1e-9);
        assert_eq!(fd.queued().unwrap(), 2, "peeking does not consume");
        assert!(matches!(fd.try_get_vec(&from, 11.0), Fetch::NoData));
    }
}
