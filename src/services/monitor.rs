//! Background polling of a simulation run.
//!
//! A [`RunMonitor`] refreshes a run on a fixed interval and publishes each
//! snapshot on a `watch` channel. Refreshes are numbered as they start; a
//! snapshot is only published when its number is higher than the one already
//! published, so a slow refresh that finishes after a newer one is dropped.
//! Dropping the monitor aborts the polling task and every refresh in flight.

use crate::services::loader::{RunSnapshot, SimulationService};
use crate::services::paginator::PageSource;
use crate::types::Identifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Refreshes allowed to overlap before interval ticks are skipped.
const MAX_IN_FLIGHT: usize = 2;

/// Latest published state of a monitored run.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    pub snapshot: Option<Arc<RunSnapshot>>,
    /// Number of the refresh that produced `snapshot`; `0` before the first.
    pub generation: u64,
    /// Set once a terminal snapshot was published and polling stopped.
    pub finished: bool,
}

/// Publish `snapshot` into `state` unless a newer refresh already landed.
///
/// Returns whether the state changed.
pub fn apply_if_newer(state: &mut MonitorState, generation: u64, snapshot: RunSnapshot) -> bool {
    if generation <= state.generation {
        return false;
    }
    state.finished = snapshot.is_terminal();
    state.snapshot = Some(Arc::new(snapshot));
    state.generation = generation;
    true
}

/// Handle to a polling task; polling stops when the handle is dropped.
pub struct RunMonitor {
    state: watch::Receiver<MonitorState>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl RunMonitor {
    /// Start polling `run_id` every `interval`. The first refresh starts
    /// immediately.
    pub fn spawn<S>(service: SimulationService<S>, run_id: Identifier, interval: Duration) -> Self
    where
        S: PageSource + ?Sized + 'static,
    {
        let (tx, rx) = watch::channel(MonitorState::default());
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(poll_loop(service, run_id, interval, tx, Arc::clone(&refresh)));

        Self {
            state: rx,
            refresh,
            task,
        }
    }

    /// Receiver that is notified whenever a newer snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    pub fn latest(&self) -> MonitorState {
        self.state.borrow().clone()
    }

    /// Start a refresh without waiting for the next interval tick.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Whether the polling task has exited.
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RunMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop<S>(
    service: SimulationService<S>,
    run_id: Identifier,
    interval: Duration,
    tx: watch::Sender<MonitorState>,
    refresh: Arc<Notify>,
) where
    S: PageSource + ?Sized + 'static,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: JoinSet<(u64, RunSnapshot)> = JoinSet::new();
    let mut issued = 0u64;

    info!("Monitoring run {} every {:?}", run_id, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                debug!("Manual refresh of run {}", run_id);
            }
            Some(joined) = in_flight.join_next() => {
                match joined {
                    Ok((generation, snapshot)) => {
                        let terminal = snapshot.is_terminal();
                        let published = tx.send_if_modified(|state| apply_if_newer(state, generation, snapshot));
                        if !published {
                            debug!("Dropped stale refresh #{} of run {}", generation, run_id);
                        } else if terminal {
                            info!("Run {} finished; polling stopped", run_id);
                            break;
                        }
                    }
                    Err(e) => error!("Refresh of run {} panicked: {}", run_id, e),
                }
                continue;
            }
        }

        if in_flight.len() >= MAX_IN_FLIGHT {
            debug!("Skipping refresh of run {}: {} already in flight", run_id, in_flight.len());
            continue;
        }

        issued += 1;
        let generation = issued;
        let service = service.clone();
        let id = run_id.clone();
        in_flight.spawn(async move { (generation, service.snapshot(&id).await) });
    }
}
