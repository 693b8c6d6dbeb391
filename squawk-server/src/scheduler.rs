//! Polling scheduler: fetch → classify → track → enqueue, on a fixed cadence.
//!
//! Cycles run sequentially on one background task. The delay is measured
//! from the start of one cycle to the start of the next; a cycle that
//! overruns is followed immediately by the next one. Fetch failures skip
//! tracking for that cycle (the emergency set is left as is) and back off
//! exponentially. A stop request is checked before every cycle and wakes
//! the inter-cycle sleep.
//!
//! Lifecycle: `Idle → Running → Stopped | Faulted`. The scheduler consumes
//! the tracker's only `TrackerWriter` and hands it back when it finishes.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use squawk_core::backoff::{Backoff, DEFAULT_INTERVAL, DEFAULT_MAX_BACKOFF};
use squawk_core::classify::classify;
use squawk_core::tracker::TrackerWriter;
use squawk_core::types::{AlertEvent, FetchError};

use crate::feed::StateFeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
    Faulted,
}

/// Observable scheduler status, published after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub cycles: u64,
    pub consecutive_failures: u32,
    pub next_delay_secs: u64,
    pub last_error: Option<String>,
}

impl SchedulerStatus {
    pub fn idle() -> Self {
        SchedulerStatus {
            state: SchedulerState::Idle,
            cycles: 0,
            consecutive_failures: 0,
            next_delay_secs: 0,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            interval: DEFAULT_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

enum CycleError {
    Fetch(FetchError),
    QueueClosed,
}

pub struct PollingScheduler {
    feed: Arc<dyn StateFeed>,
    writer: TrackerWriter,
    events: mpsc::Sender<AlertEvent>,
    backoff: Backoff,
    status: watch::Sender<SchedulerStatus>,
}

impl PollingScheduler {
    pub fn new(
        feed: Arc<dyn StateFeed>,
        writer: TrackerWriter,
        events: mpsc::Sender<AlertEvent>,
        config: ScheduleConfig,
    ) -> Self {
        let (status, _) = watch::channel(SchedulerStatus::idle());
        PollingScheduler {
            feed,
            writer,
            events,
            backoff: Backoff::new(config.interval, config.max_backoff),
            status,
        }
    }

    /// Idle → Running. Spawns the cycle task.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let status_rx = self.status.subscribe();
        self.status.send_modify(|s| s.state = SchedulerState::Running);
        tracing::info!(
            interval_secs = self.backoff.delay().as_secs(),
            "emergency monitoring started"
        );

        let task = tokio::spawn(self.run(stop_rx));
        SchedulerHandle {
            stop_tx,
            status_rx,
            task,
        }
    }

    async fn run(mut self, mut stop_rx: watch::Receiver<bool>) -> TrackerWriter {
        loop {
            if stop_requested(&stop_rx) {
                self.finish(SchedulerState::Stopped);
                break;
            }

            let started = Instant::now();
            let (delay, last_error) = match self.run_cycle().await {
                Ok(()) => (self.backoff.on_success(), None),
                Err(CycleError::Fetch(e)) => {
                    let delay = self.backoff.on_failure();
                    tracing::warn!(
                        error = %e,
                        failures = self.backoff.consecutive_failures(),
                        delay_secs = delay.as_secs(),
                        "feed fetch failed, backing off"
                    );
                    (delay, Some(e.to_string()))
                }
                Err(CycleError::QueueClosed) => {
                    tracing::error!("alert queue closed, monitoring cannot continue");
                    self.finish(SchedulerState::Faulted);
                    break;
                }
            };

            let failures = self.backoff.consecutive_failures();
            self.status.send_modify(|s| {
                s.cycles += 1;
                s.consecutive_failures = failures;
                s.next_delay_secs = delay.as_secs();
                s.last_error = last_error;
            });

            tokio::select! {
                _ = tokio::time::sleep_until(started + delay) => {}
                _ = stop_rx.changed() => {}
            }
        }
        self.writer
    }

    async fn run_cycle(&mut self) -> Result<(), CycleError> {
        let snapshot = self.feed.fetch().await.map_err(CycleError::Fetch)?;

        let emergencies = classify(&snapshot);
        if emergencies.is_empty() {
            tracing::info!(aircraft = snapshot.len(), "air is safe, no emergency code detected");
        } else {
            let ids: Vec<&str> = emergencies.iter().map(|sv| sv.icao24.as_str()).collect();
            tracing::warn!(
                aircraft = snapshot.len(),
                emergencies = emergencies.len(),
                icao24 = ?ids,
                "aircraft squawking 7700 in view"
            );
        }

        for event in self.writer.update(emergencies) {
            self.events
                .send(event)
                .await
                .map_err(|_| CycleError::QueueClosed)?;
        }
        Ok(())
    }

    fn finish(&self, state: SchedulerState) {
        self.status.send_modify(|s| s.state = state);
        tracing::info!(?state, "emergency monitoring finished");
    }
}

/// A stop request is a `true` on the channel or a dropped handle.
fn stop_requested(rx: &watch::Receiver<bool>) -> bool {
    rx.has_changed().is_err() || *rx.borrow()
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<SchedulerStatus>,
    task: JoinHandle<TrackerWriter>,
}

impl SchedulerHandle {
    /// Latest published status. A task that exited while still marked
    /// `Running` panicked, and is reported as `Faulted`.
    pub fn status(&self) -> SchedulerStatus {
        let mut status = self.status_rx.borrow().clone();
        if status.state == SchedulerState::Running && self.task.is_finished() {
            status.state = SchedulerState::Faulted;
        }
        status
    }

    pub fn state(&self) -> SchedulerState {
        self.status().state
    }

    /// Status receiver that outlives the handle.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }

    /// True once the cycle task has exited (stopped or faulted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Request stop and wait for the in-flight cycle to finish.
    ///
    /// Returns the tracker writer, or `None` if the task panicked.
    pub async fn stop(self) -> (Option<TrackerWriter>, SchedulerStatus) {
        let _ = self.stop_tx.send(true);
        let writer = match self.task.await {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::error!(error = %e, "scheduler task aborted");
                None
            }
        };
        let mut status = self.status_rx.borrow().clone();
        if writer.is_none() {
            status.state = SchedulerState::Faulted;
        }
        (writer, status)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
