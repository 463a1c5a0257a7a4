//! Monitor controller
//!
//! [`PerformanceMonitor`] ties the pipeline together. The renderer reports
//! each finished frame with [`PerformanceMonitor::record_frame`]. Every tick
//! refreshes the metrics snapshot from those frames, classifies it, asks the
//! advisor for suggestions, publishes `performance_update`, and on Poor or
//! Critical ticks lets the auto-optimizer act on the suggestions.
//!
//! The tick loop is a single tokio task driven by `tokio::time::interval`, so
//! at most one tick is in flight. The timer only evaluates; it never counts as
//! a frame. Hosts that already own a frame loop can skip the task and call
//! [`PerformanceMonitor::tick_at`] once per frame instead.
//!
//! State lives behind a `parking_lot::Mutex` that is released before any
//! listener runs, so listeners are free to call back into the monitor.

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::analysis::{classify, suggest, OptimizationAction, PerformanceLevel};
use crate::config::{
    ConfigUpdate, MonitorSettings, OptimizationConfig, PerformanceThresholds, RecoveryPolicy,
    ThresholdsUpdate,
};
use crate::error::{ConfigError, MonitorError};
use crate::events::{
    EventHub, EventKind, Listener, ListenerId, MonitorEvent, OptimizationApplied,
    PerformanceUpdate,
};
use crate::metrics::{
    MemoryProvider, MetricsAggregator, PerformanceMetrics, ProcMemoryProvider, SceneStats,
};
use crate::optimizer::{AutoOptimizer, NullRendererHooks, RendererHooks};
use crate::report::{self, PerformanceReport};

/// Copy of both sample windows, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceHistory {
    pub frame_times_ms: Vec<f64>,
    pub fps: Vec<f64>,
}

struct MonitorState {
    aggregator: MetricsAggregator,
    thresholds: PerformanceThresholds,
    optimizer: AutoOptimizer,
}

struct Inner {
    state: Mutex<MonitorState>,
    events: EventHub,
    ticker: Mutex<Option<JoinHandle<()>>>,
    memory: Box<dyn MemoryProvider>,
    default_interval: Duration,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
    }
}

/// Performance monitor handle; clones share the same monitor
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<Inner>,
}

impl PerformanceMonitor {
    /// Monitor reading memory from procfs with a renderer that accepts every action
    pub fn new(settings: &MonitorSettings) -> Self {
        Self::with_collaborators(
            settings,
            Box::new(NullRendererHooks),
            Box::new(ProcMemoryProvider::new()),
        )
    }

    /// Monitor wired to the given renderer hooks and memory source
    pub fn with_collaborators(
        settings: &MonitorSettings,
        hooks: Box<dyn RendererHooks>,
        memory: Box<dyn MemoryProvider>,
    ) -> Self {
        info!("🔧 Initializing performance monitor");
        info!("   Min FPS: {}", settings.thresholds.min_fps);
        info!("   Max memory: {}%", settings.thresholds.max_memory_usage);
        info!("   Max draw calls: {}", settings.thresholds.max_draw_calls);
        info!("   Tick interval: {}ms", settings.monitor.interval_ms);

        let optimizer = AutoOptimizer::new(settings.optimization, hooks)
            .with_recovery(settings.recovery);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(MonitorState {
                    aggregator: MetricsAggregator::new(now()),
                    thresholds: settings.thresholds,
                    optimizer,
                }),
                events: EventHub::new(),
                ticker: Mutex::new(None),
                memory,
                default_interval: settings.monitor.interval(),
            }),
        }
    }

    /// Interval from the settings the monitor was built with
    pub fn default_interval(&self) -> Duration {
        self.inner.default_interval
    }

    // === Lifecycle ===

    /// Starts the tick loop. No-op if it is already running.
    ///
    /// Both sample windows are reset; the first tick fires one interval from now.
    pub fn start_monitoring(&self, interval: Duration) -> Result<(), MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::ZeroInterval);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let mut ticker = self.inner.ticker.lock();
        match ticker.as_ref() {
            Some(handle) if !handle.is_finished() => {
                debug!("Monitoring already active");
                return Ok(());
            }
            Some(_) => warn!("⚠️ Previous tick loop ended unexpectedly, restarting"),
            None => {}
        }

        self.inner.state.lock().aggregator.reset(now());

        let weak = Arc::downgrade(&self.inner);
        *ticker = Some(runtime.spawn(run_ticker(weak, interval)));

        info!("📊 Performance monitoring started ({:?} interval)", interval);
        Ok(())
    }

    /// Stops the tick loop and clears the history. No-op when idle.
    pub fn stop_monitoring(&self) {
        let Some(handle) = self.inner.ticker.lock().take() else {
            return;
        };
        handle.abort();
        self.inner.state.lock().aggregator.clear_history();
        info!("📊 Performance monitoring stopped");
    }

    /// True while the tick loop is alive
    pub fn is_monitoring(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Stops monitoring, drops every listener and clears the history
    pub fn cleanup(&self) {
        self.stop_monitoring();
        self.inner.events.clear();
        self.inner.state.lock().aggregator.clear_history();
        debug!("Performance monitor cleaned up");
    }

    /// Clears both windows and the tick counter
    pub fn reset_stats(&self) {
        self.inner.state.lock().aggregator.reset(now());
    }

    // === Tick ===

    /// Records a frame ending at `now`, then runs one full tick
    pub fn tick_at(&self, now: Instant) -> PerformanceUpdate {
        self.record_frame(now);
        self.tick()
    }

    /// Runs one tick over the frames recorded so far and returns what was published
    pub fn tick(&self) -> PerformanceUpdate {
        let reading = self.inner.memory.sample();

        let update = {
            let mut state = self.inner.state.lock();
            if let Some(reading) = reading {
                state.aggregator.record_memory(reading);
            }
            let metrics = state.aggregator.snapshot();
            let level = classify(&metrics);
            let suggestions = suggest(&metrics, &state.thresholds);
            PerformanceUpdate {
                metrics,
                level,
                suggestions,
            }
        };

        debug!(
            "📊 {:.1} FPS, {} draw calls -> {} ({} suggestions)",
            update.metrics.fps,
            update.metrics.draw_calls,
            update.level,
            update.suggestions.len()
        );

        self.inner
            .events
            .emit(&MonitorEvent::PerformanceUpdate(update.clone()));

        let outcomes = self.optimize(update.level, &update.suggestions);
        for outcome in outcomes {
            self.inner
                .events
                .emit(&MonitorEvent::OptimizationApplied(outcome));
        }

        update
    }

    fn optimize(
        &self,
        level: PerformanceLevel,
        suggestions: &[OptimizationAction],
    ) -> Vec<OptimizationApplied> {
        let mut state = self.inner.state.lock();
        let optimizer = &mut state.optimizer;

        let mut outcomes = if optimizer.config().auto_optimize && level.needs_optimization() {
            optimizer.apply(suggestions)
        } else {
            Vec::new()
        };

        if let Some(restored) = optimizer.observe_level(level) {
            outcomes.push(restored);
        }

        outcomes
    }

    // === Inbound from the renderer ===

    /// Records a finished frame; the frame time is measured from the previous one
    pub fn record_frame(&self, now: Instant) {
        self.inner.state.lock().aggregator.record_frame(now);
    }

    pub fn record_render_time(&self, start: Instant, end: Instant) {
        self.inner
            .state
            .lock()
            .aggregator
            .record_render_time(start, end);
    }

    pub fn record_update_time(&self, start: Instant, end: Instant) {
        self.inner
            .state
            .lock()
            .aggregator
            .record_update_time(start, end);
    }

    pub fn update_model_stats(
        &self,
        model_count: u32,
        texture_memory_bytes: u64,
        draw_calls: u32,
        triangle_count: u64,
    ) {
        self.inner
            .state
            .lock()
            .aggregator
            .update_model_stats(SceneStats {
                model_count,
                texture_memory_bytes,
                draw_calls,
                triangle_count,
            });
    }

    // === Inbound from the host ===

    /// Shallow-merges thresholds; invalid fields keep their value and are returned
    pub fn set_thresholds(&self, update: ThresholdsUpdate) -> Vec<ConfigError> {
        self.inner.state.lock().thresholds.merge(&update)
    }

    /// Shallow-merges the optimization config; invalid fields keep their value and are returned
    pub fn set_config(&self, update: ConfigUpdate) -> Vec<ConfigError> {
        self.inner.state.lock().optimizer.update_config(&update)
    }

    pub fn set_recovery_policy(&self, recovery: RecoveryPolicy) {
        self.inner.state.lock().optimizer.set_recovery(recovery);
    }

    // === Outbound reads ===

    pub fn get_metrics(&self) -> PerformanceMetrics {
        self.inner.state.lock().aggregator.metrics().clone()
    }

    /// Level of the latest snapshot; `Excellent` before the first tick
    pub fn get_performance_level(&self) -> PerformanceLevel {
        classify(self.inner.state.lock().aggregator.metrics())
    }

    pub fn get_optimization_suggestions(&self) -> Vec<OptimizationAction> {
        let state = self.inner.state.lock();
        suggest(state.aggregator.metrics(), &state.thresholds)
    }

    pub fn get_performance_history(&self) -> PerformanceHistory {
        let state = self.inner.state.lock();
        PerformanceHistory {
            frame_times_ms: state.aggregator.frame_times().to_vec(),
            fps: state.aggregator.fps_history().to_vec(),
        }
    }

    pub fn get_config(&self) -> OptimizationConfig {
        self.inner.state.lock().optimizer.config()
    }

    pub fn get_thresholds(&self) -> PerformanceThresholds {
        self.inner.state.lock().thresholds
    }

    pub fn generate_report(&self) -> PerformanceReport {
        let state = self.inner.state.lock();
        report::generate_report(
            &state.aggregator,
            &state.thresholds,
            state.optimizer.config(),
        )
    }

    // === Events ===

    pub fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.inner.events.on(kind, listener)
    }

    pub fn on_fn<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&MonitorEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.events.on_fn(kind, listener)
    }

    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.events.off(kind, id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.events.listener_count(kind)
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(&MonitorSettings::default())
    }
}

/// Current time on the tokio clock, so paused-time tests see advancing frames
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn run_ticker(monitor: Weak<Inner>, interval: Duration) {
    let start = tokio::time::Instant::now() + interval;
    let mut timer = tokio::time::interval_at(start, interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;
        let Some(inner) = monitor.upgrade() else {
            break;
        };
        PerformanceMonitor { inner }.tick();
    }
}
