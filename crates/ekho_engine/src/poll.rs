use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;

use ekho_logging::{ekho_debug, ekho_info};
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::EngineEvent;

/// Per-job repeating timers.
///
/// A timer only reports `PollTick`s; whether a tick turns into a status
/// query is decided by the caller. Every timer hangs off one root token so
/// that [`PollTimers::stop_all`] cancels timers started by any caller.
pub struct PollTimers {
    root: CancellationToken,
    timers: HashMap<String, CancellationToken>,
    events: mpsc::Sender<EngineEvent>,
}

impl PollTimers {
    pub fn new(events: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            root: CancellationToken::new(),
            timers: HashMap::new(),
            events,
        }
    }

    /// Start ticking for `job_id`, replacing any timer already running for it.
    /// The first tick fires one `interval` after the start.
    pub fn start(&mut self, runtime: &Handle, job_id: String, interval: Duration) {
        let interval = interval.max(Duration::from_millis(1));
        if let Some(previous) = self.timers.remove(&job_id) {
            previous.cancel();
        }
        let token = self.root.child_token();
        self.timers.insert(job_id.clone(), token.clone());
        ekho_info!(job = job_id; "poller started every {:?}", interval);
        runtime.spawn(run_timer(job_id, interval, token, self.events.clone()));
    }

    /// Returns whether a timer was running.
    pub fn stop(&mut self, job_id: &str) -> bool {
        match self.timers.remove(job_id) {
            Some(token) => {
                token.cancel();
                ekho_info!(job = job_id; "poller stopped");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        self.root.cancel();
        self.root = CancellationToken::new();
        let stopped = self.timers.len();
        self.timers.clear();
        ekho_info!("stopped {} poller(s)", stopped);
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.timers.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Drop for PollTimers {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn run_timer(
    job_id: String,
    interval: Duration,
    token: CancellationToken,
    events: mpsc::Sender<EngineEvent>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let tick = EngineEvent::PollTick { job_id: job_id.clone() };
                if events.send(tick).is_err() {
                    break;
                }
            }
        }
    }
    ekho_debug!(job = job_id; "timer task finished");
}
