//! Refresh cycle and scheduler behaviour against a scripted sample source.
//!
//! Run with: cargo test --test scheduler_test

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use aqi_live::backend::SampleSource;
use aqi_live::error::{FetchError, SchedulerError};
use aqi_live::render::{DashboardView, DisplayMeta, RenderSink};
use aqi_live::series::{
    Sample, Series, SeriesId, SeriesRegistry, SeriesStatus, SharedRegistry, UpdateMode,
};
use aqi_live::sync::{FetchScheduler, Synchronizer};

#[derive(Clone)]
struct Script {
    delay: Duration,
    result: Result<Vec<Sample>, FetchError>,
}

/// Answers each stream with a fixed result after a fixed delay.
#[derive(Default)]
struct ScriptedSource {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
    mode: UpdateMode,
}

impl ScriptedSource {
    fn replacing(mut self) -> Self {
        self.mode = UpdateMode::Replace;
        self
    }

    fn with(mut self, stream: &str, delay: Duration, result: Result<Vec<Sample>, FetchError>) -> Self {
        self.scripts.insert(stream.to_string(), Script { delay, result });
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn fetch(&self, series: &Series) -> Result<Vec<Sample>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .get(&series.stream)
            .cloned()
            .unwrap_or(Script {
                delay: Duration::ZERO,
                result: Ok(Vec::new()),
            });
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.result
    }

    fn update_mode(&self) -> UpdateMode {
        self.mode
    }
}

fn sample(secs: i64, value: f64) -> Sample {
    Sample::new(Utc.timestamp_opt(secs, 0).unwrap(), value)
}

fn series(stream: &str) -> Series {
    Series {
        id: SeriesId::new(stream),
        display_name: stream.to_uppercase(),
        unit: "ppm".to_string(),
        stream: stream.to_string(),
    }
}

fn registry_of(streams: &[&str]) -> SharedRegistry {
    let mut registry = SeriesRegistry::default();
    for stream in streams {
        registry.register(series(stream)).unwrap();
    }
    registry.shared()
}

struct Harness {
    registry: SharedRegistry,
    source: Arc<ScriptedSource>,
    view: Arc<DashboardView>,
    sync: Arc<Synchronizer>,
}

fn harness(streams: &[&str], source: ScriptedSource) -> Harness {
    let registry = registry_of(streams);
    let source = Arc::new(source);
    let view = Arc::new(DashboardView::new());
    let sync = Arc::new(Synchronizer::new(
        Arc::clone(&registry),
        source.clone(),
        view.clone(),
    ));
    Harness {
        registry,
        source,
        view,
        sync,
    }
}

fn backend_down() -> FetchError {
    FetchError::Status {
        status: 500,
        body: "boom".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn failed_series_does_not_affect_others() {
    let h = harness(
        &["a", "b"],
        ScriptedSource::default()
            .with("a", Duration::ZERO, Ok(vec![sample(1, 12.5)]))
            .with("b", Duration::ZERO, Err(backend_down())),
    );

    let report = h.sync.run_cycle().await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(h.sync.cycles_completed(), 1);
    assert_eq!(h.sync.last_refreshed().await, Some(report.finished_at));

    let registry = h.registry.read().await;
    let a = SeriesId::new("a");
    let b = SeriesId::new("b");

    assert_eq!(registry.buffer(&a).unwrap().len(), 1);
    assert_eq!(registry.health(&a).unwrap().status, SeriesStatus::Connected);
    assert_eq!(h.view.render_count(&a), 1);

    let b_health = registry.health(&b).unwrap();
    assert_eq!(b_health.status, SeriesStatus::Error);
    assert!(b_health.last_error.as_deref().unwrap().contains("500"));
    assert!(registry.buffer(&b).unwrap().is_empty());
    assert_eq!(h.view.render_count(&b), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_reading_is_warning_not_zero() {
    let h = harness(
        &["a"],
        ScriptedSource::default().with("a", Duration::ZERO, Ok(Vec::new())),
    );

    let report = h.sync.run_cycle().await;
    assert_eq!(report.succeeded, 1);

    let registry = h.registry.read().await;
    let a = SeriesId::new("a");
    assert_eq!(registry.health(&a).unwrap().status, SeriesStatus::Warning);
    assert!(registry.buffer(&a).unwrap().is_empty());
    assert!(h.view.window(&a).unwrap().samples.is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_series_does_not_delay_fast_ones() {
    let h = harness(
        &["slow", "fast"],
        ScriptedSource::default()
            .with("slow", Duration::from_secs(10), Ok(vec![sample(1, 1.0)]))
            .with("fast", Duration::ZERO, Ok(vec![sample(1, 2.0)])),
    );

    let sync = Arc::clone(&h.sync);
    let cycle = tokio::spawn(async move { sync.run_cycle().await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.view.render_count(&SeriesId::new("fast")), 1);
    assert_eq!(h.view.render_count(&SeriesId::new("slow")), 0);
    assert!(h.sync.last_refreshed().await.is_none());

    let report = cycle.await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(h.view.render_count(&SeriesId::new("slow")), 1);
    assert!(h.sync.last_refreshed().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn late_result_for_removed_series_is_dropped() {
    let h = harness(
        &["a", "b"],
        ScriptedSource::default()
            .with("a", Duration::from_secs(5), Ok(vec![sample(1, 1.0)]))
            .with("b", Duration::ZERO, Ok(vec![sample(1, 2.0)])),
    );

    let sync = Arc::clone(&h.sync);
    let cycle = tokio::spawn(async move { sync.run_cycle().await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    h.registry
        .write()
        .await
        .remove(&SeriesId::new("a"))
        .unwrap();

    let report = cycle.await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(h.view.render_count(&SeriesId::new("a")), 0);
    assert_eq!(h.registry.read().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn interval_change_rearms_without_extra_cycle() {
    let h = harness(
        &["a"],
        ScriptedSource::default().with("a", Duration::ZERO, Ok(vec![sample(1, 1.0)])),
    );
    let scheduler = FetchScheduler::new(Arc::clone(&h.sync), Duration::from_secs(5));

    assert_ok!(scheduler.start(Duration::from_millis(5000)).await);
    assert_ok!(scheduler.set_interval(Duration::from_millis(1000)).await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = scheduler.status().await;
    assert!(status.running);
    assert_eq!(status.interval_ms, 1000);
    assert_eq!(status.timers_armed, 2);
    assert_eq!(status.timers_cancelled, 1);
    assert_eq!(status.cycles_completed, 1);

    // Ticks at 1s, 2s and 3s on the new cadence.
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(h.sync.cycles_completed(), 4);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_while_running_restarts_schedule() {
    let h = harness(&["a"], ScriptedSource::default());
    let scheduler = FetchScheduler::new(Arc::clone(&h.sync), Duration::from_secs(1));

    assert_ok!(scheduler.start(Duration::from_secs(1)).await);
    assert_ok!(scheduler.start(Duration::from_secs(2)).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let status = scheduler.status().await;
    assert_eq!(status.timers_armed, 2);
    assert_eq!(status.timers_cancelled, 1);
    assert_eq!(status.interval_ms, 2000);
    assert_eq!(status.cycles_completed, 2);

    // The one-second timer is gone: nothing new until the two-second tick.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.sync.cycles_completed(), 2);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.sync.cycles_completed(), 3);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_lets_in_flight_fetches_land() {
    let h = harness(
        &["a"],
        ScriptedSource::default().with("a", Duration::from_secs(2), Ok(vec![sample(1, 7.0)])),
    );
    let scheduler = FetchScheduler::new(Arc::clone(&h.sync), Duration::from_secs(10));

    assert_ok!(scheduler.start(Duration::from_secs(10)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.source.calls(), 1);

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let window = h.view.window(&SeriesId::new("a")).unwrap();
    assert_eq!(window.samples, vec![sample(1, 7.0)]);
    assert_eq!(h.sync.cycles_completed(), 1);

    // No further ticks once stopped.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.source.calls(), 1);
    assert_eq!(scheduler.status().await.timers_cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn interval_set_while_stopped_applies_on_resume() {
    let h = harness(&["a"], ScriptedSource::default());
    let scheduler = FetchScheduler::new(Arc::clone(&h.sync), Duration::from_secs(5));

    assert_ok!(scheduler.set_interval(Duration::from_secs(1)).await);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.sync.cycles_completed(), 0);
    assert_eq!(scheduler.status().await.timers_armed, 0);

    scheduler.resume().await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let status = scheduler.status().await;
    assert!(status.running);
    assert_eq!(status.interval_ms, 1000);
    assert_eq!(status.cycles_completed, 2);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_rejected() {
    let h = harness(&["a"], ScriptedSource::default());
    let scheduler = FetchScheduler::new(Arc::clone(&h.sync), Duration::from_secs(5));

    let err = assert_err!(scheduler.start(Duration::ZERO).await);
    assert_eq!(err, SchedulerError::InvalidInterval);
    assert_err!(scheduler.set_interval(Duration::ZERO).await);

    assert!(!scheduler.is_running().await);
    assert_eq!(scheduler.status().await.interval_ms, 5000);
    assert_eq!(h.source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_history_replaces_the_window() {
    let h = harness(
        &["a"],
        ScriptedSource::default()
            .with(
                "a",
                Duration::ZERO,
                Ok(vec![sample(1, 1.0), sample(2, 2.0), sample(2, 2.5)]),
            )
            .replacing(),
    );

    h.sync.run_cycle().await;
    h.sync.run_cycle().await;

    let window = h.view.window(&SeriesId::new("a")).unwrap();
    assert_eq!(window.samples, vec![sample(1, 1.0), sample(2, 2.0), sample(2, 2.5)]);
    assert_eq!(window.renders, 2);
}

#[tokio::test(start_paused = true)]
async fn appended_samples_sharing_a_timestamp_are_kept() {
    let h = harness(
        &["a"],
        ScriptedSource::default().with("a", Duration::ZERO, Ok(vec![sample(10, 1.0)])),
    );

    h.sync.run_cycle().await;
    h.sync.run_cycle().await;

    let window = h.view.window(&SeriesId::new("a")).unwrap();
    assert_eq!(window.samples, vec![sample(10, 1.0), sample(10, 1.0)]);
}

/// Notes, for each render, whether the registry was write-locked at the time.
struct LockCheckingSink {
    registry: SharedRegistry,
    observed: Mutex<Vec<(SeriesId, bool)>>,
}

impl RenderSink for LockCheckingSink {
    fn render(&self, id: &SeriesId, _samples: &[Sample], _meta: &DisplayMeta) {
        let locked = self.registry.try_read().is_err();
        self.observed.lock().unwrap().push((id.clone(), locked));
    }
}

#[tokio::test(start_paused = true)]
async fn windows_are_rendered_while_the_registry_is_locked() {
    let registry = registry_of(&["a", "b"]);
    let source = Arc::new(
        ScriptedSource::default()
            .with("a", Duration::ZERO, Ok(vec![sample(1, 1.0)]))
            .with("b", Duration::from_secs(1), Ok(vec![sample(1, 2.0)])),
    );
    let sink = Arc::new(LockCheckingSink {
        registry: Arc::clone(&registry),
        observed: Mutex::new(Vec::new()),
    });
    let sync = Arc::new(Synchronizer::new(
        Arc::clone(&registry),
        source,
        sink.clone(),
    ));
    let first = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.run_cycle().await }
    });
    let second = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.run_cycle().await }
    });
    first.await.unwrap();
    second.await.unwrap();

    let observed = sink.observed.lock().unwrap();
    assert_eq!(observed.len(), 4);
    assert!(observed.iter().all(|(_, locked)| *locked));
}
