use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use utoipa::ToSchema;

use crate::error::SchedulerError;
use crate::sync::cycle::{CycleReport, Synchronizer};

/// Polling state owned by the scheduler.
#[derive(Debug)]
struct SchedulerState {
    interval: Duration,
    running: bool,
    active_timer: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub timers_armed: u64,
    pub timers_cancelled: u64,
}

/// Drives periodic refresh cycles.
///
/// Stopping or re-arming only cancels the timer task. Each tick spawns its
/// cycle as a detached task, so fetches already in flight still land.
pub struct FetchScheduler {
    sync: Arc<Synchronizer>,
    state: Mutex<SchedulerState>,
    timers_armed: AtomicU64,
    timers_cancelled: AtomicU64,
}

impl FetchScheduler {
    #[must_use]
    pub fn new(sync: Arc<Synchronizer>, interval: Duration) -> Self {
        Self {
            sync,
            state: Mutex::new(SchedulerState {
                interval,
                running: false,
                active_timer: None,
            }),
            timers_armed: AtomicU64::new(0),
            timers_cancelled: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    /// Run one cycle immediately, then every `interval`.
    ///
    /// Calling this while running restarts the schedule.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidInterval` for a zero interval.
    pub async fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        validate(interval)?;

        let mut state = self.state.lock().await;
        self.cancel_timer(&mut state);
        state.interval = interval;
        state.running = true;

        let sync = Arc::clone(&self.sync);
        tokio::spawn(async move {
            sync.run_cycle().await;
        });

        self.arm_timer(&mut state);

        tracing::info!(interval_ms = interval.as_millis() as u64, "Polling started");
        Ok(())
    }

    /// Start again with the last configured interval.
    pub async fn resume(&self) {
        let interval = self.state.lock().await.interval;
        // The stored interval was validated when it was set.
        if let Err(e) = self.start(interval).await {
            tracing::error!(error = %e, "Failed to resume polling");
        }
    }

    /// Change the cadence. While running the timer is re-armed without an
    /// extra immediate cycle; while stopped the value is kept for `start`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidInterval` for a zero interval.
    pub async fn set_interval(&self, interval: Duration) -> Result<(), SchedulerError> {
        validate(interval)?;

        let mut state = self.state.lock().await;
        state.interval = interval;
        if state.running {
            self.cancel_timer(&mut state);
            self.arm_timer(&mut state);
        }

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            running = state.running,
            "Polling interval changed"
        );
        Ok(())
    }

    /// Stop scheduling new cycles. In-flight cycles run to completion.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        self.cancel_timer(&mut state);
        if state.running {
            tracing::info!("Polling stopped");
        }
        state.running = false;
    }

    /// Run one cycle now, outside the timer.
    pub async fn refresh_now(&self) -> CycleReport {
        self.sync.run_cycle().await
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn status(&self) -> SchedulerStatus {
        let (running, interval) = {
            let state = self.state.lock().await;
            (state.running, state.interval)
        };

        SchedulerStatus {
            running,
            interval_ms: interval.as_millis() as u64,
            last_refreshed: self.sync.last_refreshed().await,
            cycles_completed: self.sync.cycles_completed(),
            timers_armed: self.timers_armed.load(Ordering::Relaxed),
            timers_cancelled: self.timers_cancelled.load(Ordering::Relaxed),
        }
    }

    fn cancel_timer(&self, state: &mut SchedulerState) {
        if let Some(handle) = state.active_timer.take() {
            handle.abort();
            self.timers_cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn arm_timer(&self, state: &mut SchedulerState) {
        debug_assert!(state.active_timer.is_none());

        let period = state.interval;
        let sync = Arc::clone(&self.sync);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = IntervalStream::new(ticker);

            while ticks.next().await.is_some() {
                let sync = Arc::clone(&sync);
                tokio::spawn(async move {
                    sync.run_cycle().await;
                });
            }
        });

        state.active_timer = Some(handle);
        self.timers_armed.fetch_add(1, Ordering::Relaxed);
    }
}

impl Drop for FetchScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().active_timer.take() {
            handle.abort();
        }
    }
}

fn validate(interval: Duration) -> Result<(), SchedulerError> {
    if interval.is_zero() {
        Err(SchedulerError::InvalidInterval)
    } else {
        Ok(())
    }
}
