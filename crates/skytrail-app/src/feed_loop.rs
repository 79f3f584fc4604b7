//! Feed worker thread: releases recorded reports into the shared flight
//! data as simulated time reaches their receive time.
//!
//! The worker owns the remaining records. The tick loop asks it to catch up
//! to the current simulated time via `mpsc` and waits for the ack, so the
//! replay stays reproducible while the flight data is still filled from a
//! thread other than the one ticking the engine.

use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use skytrail_core::errors::TrajectoryError;
use skytrail_sim::provider::SharedFlightData;

use crate::errors::{ReplayError, Result};
use crate::track::TrackRecord;

/// Flight data per aircraft key, shared between the worker and the tick loop.
#[derive(Debug, Default, Clone)]
pub struct FeedRegistry(Arc<Mutex<BTreeMap<String, Arc<SharedFlightData>>>>);

impl FeedRegistry {
    pub fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Arc<SharedFlightData>>>> {
        self.0
            .lock()
            .map_err(|_| ReplayError::FeedError(TrajectoryError::LockPoisoned))
    }

    pub fn get(&self, key: &str) -> Result<Option<Arc<SharedFlightData>>> {
        Ok(self.lock()?.get(key).cloned())
    }
}

/// Commands sent from the tick loop to the feed worker.
#[derive(Debug)]
pub enum FeedCommand {
    /// Deliver every report received up to this simulated time.
    ReleaseUntil(f64),
    /// Shut down the worker thread gracefully.
    Shutdown,
}

/// Handle to the running worker. Dropping it stops the thread.
pub struct FeedWorker {
    cmd_tx: mpsc::Sender<FeedCommand>,
    ack_rx: mpsc::Receiver<usize>,
    handle: Option<JoinHandle<()>>,
}

impl FeedWorker {
    /// Spawns the worker in a new thread.
    pub fn spawn(records: Vec<TrackRecord>, registry: FeedRegistry) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<FeedCommand>();
        let (ack_tx, ack_rx) = mpsc::channel::<usize>();

        let handle = std::thread::Builder::new()
            .name("skytrail-feed".into())
            .spawn(move || run_feed_loop(records.into(), &registry, cmd_rx, ack_tx))?;

        Ok(Self {
            cmd_tx,
            ack_rx,
            handle: Some(handle),
        })
    }

    /// Release reports up to `sim_time` and wait until they are buffered.
    /// Returns the number of waypoints added.
    pub fn release_until(&self, sim_time: f64) -> Result<usize> {
        self.cmd_tx
            .send(FeedCommand::ReleaseUntil(sim_time))
            .map_err(|_| ReplayError::WorkerGone)?;
        self.ack_rx.recv().map_err(|_| ReplayError::WorkerGone)
    }
}

impl Drop for FeedWorker {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(FeedCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// The worker loop. Runs until Shutdown or channel disconnect.
fn run_feed_loop(
    mut records: VecDeque<TrackRecord>,
    registry: &FeedRegistry,
    cmd_rx: mpsc::Receiver<FeedCommand>,
    ack_tx: mpsc::Sender<usize>,
) {
    while let Ok(FeedCommand::ReleaseUntil(sim_time)) = cmd_rx.recv() {
        let added = match release(&mut records, registry, sim_time) {
            Ok(added) => added,
            Err(err) => {
                warn!(%err, "feed worker giving up");
                return;
            }
        };
        service_calc_requests(registry);
        if ack_tx.send(added).is_err() {
            return;
        }
    }
}

/// Move all records received by `until` into their aircraft's flight data,
/// creating the flight data on an aircraft's first report.
pub fn release(records: &mut VecDeque<TrackRecord>, registry: &FeedRegistry, until: f64) -> Result<usize> {
    let mut added = 0;
    while records.front().is_some_and(|r| r.received_at <= until) {
        let Some(record) = records.pop_front() else {
            break;
        };
        let fd = {
            let mut feeds = registry.lock()?;
            feeds
                .entry(record.key.clone())
                .or_insert_with(|| {
                    debug!(aircraft = %record.key, "new flight data");
                    Arc::new(SharedFlightData::new(
                        record.key.clone(),
                        record.static_data.clone().unwrap_or_default(),
                    ))
                })
                .clone()
        };

        if let Some(static_data) = record.static_data {
            fd.set_static(static_data)?;
        }
        if let Some(ts) = record.rotate_ts {
            fd.set_rotate_ts(ts)?;
        }
        if fd.add_waypoint(record.waypoint)? {
            added += 1;
        } else {
            debug!(
                aircraft = %record.key,
                ts = record.waypoint.ts,
                "report too close to a buffered one, dropped"
            );
        }
    }
    Ok(added)
}

/// Recorded tracks cannot compute positions on demand, so requests are only
/// acknowledged.
fn service_calc_requests(registry: &FeedRegistry) {
    let Ok(feeds) = registry.lock() else {
        return;
    };
    for (key, fd) in feeds.iter() {
        if let Ok(Some(ts)) = fd.take_calc_request() {
            debug!(aircraft = %key, ts, "position calculation requested");
        }
    }
}
