//! Monitoring facade: the only entry points the CLI and HTTP API call.
//!
//! Owns the emergency tracker across start/stop cycles. The tracker's single
//! writer lives inside the running scheduler (or here while stopped), so at
//! most one scheduler ever mutates the emergency set.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use squawk_core::tracker::{AlertTracker, EmergencyView, TrackerWriter};
use squawk_core::types::{LookupError, MonitorError, RenderError, StateVector};

use crate::dispatcher::{spawn_worker, AlertDispatcher};
use crate::feed::StateFeed;
use crate::lookup::FlightLookup;
use crate::scheduler::{
    PollingScheduler, ScheduleConfig, SchedulerHandle, SchedulerState, SchedulerStatus,
};

pub struct Monitor {
    feed: Arc<dyn StateFeed>,
    dispatcher: Arc<AlertDispatcher>,
    schedule: ScheduleConfig,
    queue_capacity: usize,
    lookup: FlightLookup,
    view: RwLock<EmergencyView>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    writer: Option<TrackerWriter>,
    running: Option<Running>,
    /// Status of a run being stopped outside the lock.
    stopping: Option<watch::Receiver<SchedulerStatus>>,
    last_status: SchedulerStatus,
}

struct Running {
    handle: SchedulerHandle,
    worker: JoinHandle<()>,
}

impl Monitor {
    pub fn new(
        feed: Arc<dyn StateFeed>,
        dispatcher: Arc<AlertDispatcher>,
        schedule: ScheduleConfig,
        queue_capacity: usize,
    ) -> Self {
        let (writer, view) = AlertTracker::new().shared();
        Monitor {
            lookup: FlightLookup::new(Arc::clone(&feed)),
            feed,
            dispatcher,
            schedule,
            queue_capacity: queue_capacity.max(1),
            view: RwLock::new(view),
            inner: Arc::new(Mutex::new(Inner {
                writer: Some(writer),
                running: None,
                stopping: None,
                last_status: SchedulerStatus::idle(),
            })),
        }
    }

    /// Start the polling scheduler and its dispatch worker.
    pub async fn start_monitoring(&self) -> Result<(), MonitorError> {
        let mut inner = self.inner.lock().await;

        if inner.stopping.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }
        if let Some(running) = &inner.running {
            if !running.handle.is_finished() {
                return Err(MonitorError::AlreadyRunning);
            }
        }
        // A faulted run is reaped first so its writer can be reused
        if let Some(done) = inner.running.take() {
            let (writer, status) = Self::shutdown(done).await;
            inner.writer = writer;
            inner.last_status = status;
        }

        let writer = match inner.writer.take() {
            Some(w) => w,
            None => {
                tracing::warn!("emergency set lost with a crashed scheduler, starting fresh");
                let (writer, view) = AlertTracker::new().shared();
                *self.view.write().unwrap_or_else(PoisonError::into_inner) = view;
                writer
            }
        };

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let worker = spawn_worker(Arc::clone(&self.dispatcher), rx);
        let handle = PollingScheduler::new(Arc::clone(&self.feed), writer, tx, self.schedule).start();

        inner.running = Some(Running { handle, worker });
        Ok(())
    }

    /// Stop the scheduler, let the in-flight cycle finish, and drain queued
    /// alerts. Returns the final status.
    ///
    /// The lock is released while waiting, so status queries stay live.
    /// Starting again is refused until the stop completes. The wait runs on
    /// its own task and completes even if the caller goes away.
    pub async fn stop_monitoring(&self) -> Result<SchedulerStatus, MonitorError> {
        let running = {
            let mut inner = self.inner.lock().await;
            let running = inner.running.take().ok_or(MonitorError::NotRunning)?;
            inner.stopping = Some(running.handle.subscribe());
            running
        };

        let shared = Arc::clone(&self.inner);
        let finish = tokio::spawn(async move {
            let (writer, status) = Self::shutdown(running).await;
            let mut inner = shared.lock().await;
            inner.writer = writer;
            inner.last_status = status.clone();
            inner.stopping = None;
            status
        });

        match finish.await {
            Ok(status) => Ok(status),
            Err(e) => {
                tracing::error!(error = %e, "scheduler shutdown aborted");
                let mut inner = self.inner.lock().await;
                inner.stopping = None;
                inner.last_status.state = SchedulerState::Faulted;
                Ok(inner.last_status.clone())
            }
        }
    }

    async fn shutdown(running: Running) -> (Option<TrackerWriter>, SchedulerStatus) {
        tracing::debug!(state = ?running.handle.state(), "stopping scheduler");
        let (writer, status) = running.handle.stop().await;
        if let Err(e) = running.worker.await {
            tracing::error!(error = %e, "alert dispatch worker aborted");
        }
        (writer, status)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let inner = self.inner.lock().await;
        if let Some(running) = &inner.running {
            return running.handle.status();
        }
        match &inner.stopping {
            Some(rx) => rx.borrow().clone(),
            None => inner.last_status.clone(),
        }
    }

    /// Copy of the aircraft currently in emergency.
    pub fn list_current_emergencies(&self) -> Vec<StateVector> {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub async fn lookup_flight(&self, icao24: &str) -> Result<StateVector, LookupError> {
        self.lookup.lookup(icao24).await
    }

    /// Render a flight with the configured route, outside the alert path.
    pub async fn render_flight(&self, flight: &StateVector) -> Result<PathBuf, RenderError> {
        self.dispatcher
            .renderer()
            .render(flight, self.dispatcher.route())
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
