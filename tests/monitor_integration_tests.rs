//! Integration tests for the quality monitor
//!
//! These tests drive the public API end to end: settings file to monitor,
//! ticks through classification and advice, renderer hooks, and events.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use quality_monitor::{
    EventKind, MemoryProvider, MemoryReading, MonitorEvent, MonitorSettings, OptimizationAction,
    OptimizationApplied, OptimizationConfig, OptimizationError, PerformanceLevel,
    PerformanceMonitor, QualityLevel, RecoveryPolicy, RendererHooks,
};
use quality_monitor::metrics::NoMemoryProvider;
use quality_monitor::NullRendererHooks;

/// Reports a fixed share of memory in use
struct FixedMemory(u64);

impl MemoryProvider for FixedMemory {
    fn sample(&self) -> Option<MemoryReading> {
        Some(MemoryReading {
            used_bytes: self.0,
            total_bytes: 100,
        })
    }
}

/// Renderer without texture compression support
struct NoCompressionRenderer {
    seen: Arc<Mutex<Vec<OptimizationAction>>>,
}

impl RendererHooks for NoCompressionRenderer {
    fn apply_optimization(
        &mut self,
        action: OptimizationAction,
        _config: &OptimizationConfig,
    ) -> Result<(), OptimizationError> {
        self.seen.lock().push(action);
        match action {
            OptimizationAction::CompressTextures => Err(OptimizationError::Unsupported { action }),
            _ => Ok(()),
        }
    }
}

fn collect_applied(monitor: &PerformanceMonitor) -> Arc<Mutex<Vec<OptimizationApplied>>> {
    let applied = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&applied);
    monitor.on_fn(EventKind::OptimizationApplied, move |event| {
        if let MonitorEvent::OptimizationApplied(outcome) = event {
            sink.lock().push(outcome.clone());
        }
        Ok(())
    });
    applied
}

/// Ticks `count` frames of `frame` each after `now`, returning the last tick time
fn run_frames(
    monitor: &PerformanceMonitor,
    mut now: Instant,
    frame: Duration,
    count: usize,
) -> Instant {
    for _ in 0..count {
        now += frame;
        monitor.tick_at(now);
    }
    now
}

/// Current time on the tokio clock
fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Renderer whose frame-skipping support crashes
struct PanickingSkipRenderer;

impl RendererHooks for PanickingSkipRenderer {
    fn apply_optimization(
        &mut self,
        action: OptimizationAction,
        _config: &OptimizationConfig,
    ) -> Result<(), OptimizationError> {
        if action == OptimizationAction::SkipFrames {
            panic!("frame skipping crashed the renderer");
        }
        Ok(())
    }
}

/// A critical tick degrades the config in one pass
#[test]
fn test_critical_tick_degrades_config() {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(FixedMemory(96)),
    );
    let applied = collect_applied(&monitor);

    monitor.update_model_stats(8, 512 * 1024 * 1024, 120, 80_000);
    monitor.reset_stats();
    let update = monitor.tick_at(Instant::now() + Duration::from_micros(55_555));

    assert_eq!(update.level, PerformanceLevel::Critical);
    assert_eq!(update.suggestions.len(), 5);

    let config = monitor.get_config();
    assert_eq!(config.quality_level, QualityLevel::High);
    assert!(config.frame_skipping_enabled);
    assert!(config.culling_enabled);
    assert!(config.texture_compression_enabled);

    let applied = applied.lock();
    let actions: Vec<_> = applied.iter().map(|o| o.action).collect();
    assert_eq!(actions, update.suggestions);
    assert!(applied.iter().all(|o| o.success));
}

/// One refused action does not stop the rest of the batch
#[test]
fn test_renderer_refusal_is_isolated() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NoCompressionRenderer {
            seen: Arc::clone(&seen),
        }),
        Box::new(FixedMemory(96)),
    );
    let applied = collect_applied(&monitor);

    monitor.update_model_stats(8, 0, 120, 0);
    monitor.reset_stats();
    monitor.tick_at(Instant::now() + Duration::from_millis(60));

    assert_eq!(seen.lock().len(), 5);

    let applied = applied.lock();
    let failed: Vec<_> = applied.iter().filter(|o| !o.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].action, OptimizationAction::CompressTextures);
    assert!(failed[0].error.is_some());

    let config = monitor.get_config();
    assert_eq!(config.quality_level, QualityLevel::High);
    assert!(config.frame_skipping_enabled);
    assert!(config.culling_enabled);
    assert!(!config.texture_compression_enabled);
}

/// Repeated critical ticks walk the ladder down and stop at low
#[test]
fn test_sustained_load_saturates_at_low() {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    monitor.reset_stats();
    run_frames(&monitor, Instant::now(), Duration::from_millis(100), 10);

    let config = monitor.get_config();
    assert_eq!(config.quality_level, QualityLevel::Low);
    assert!(config.frame_skipping_enabled);
    assert_eq!(monitor.get_performance_level(), PerformanceLevel::Critical);
}

/// Without recovery, quality never comes back up
#[test]
fn test_quality_is_monotonic_by_default() {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    monitor.reset_stats();
    let now = run_frames(&monitor, Instant::now(), Duration::from_millis(50), 1);
    assert_eq!(monitor.get_config().quality_level, QualityLevel::High);

    run_frames(&monitor, now, Duration::from_millis(10), 120);
    assert_eq!(monitor.get_performance_level(), PerformanceLevel::Excellent);
    assert_eq!(monitor.get_config().quality_level, QualityLevel::High);
}

/// With recovery enabled a good run restores quality one step at a time
#[test]
fn test_recovery_restores_quality() {
    let mut settings = MonitorSettings::default();
    settings.recovery = RecoveryPolicy {
        enabled: true,
        sustained_ticks: 3,
    };
    let monitor = PerformanceMonitor::with_collaborators(
        &settings,
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    let applied = collect_applied(&monitor);

    monitor.reset_stats();
    let now = run_frames(&monitor, Instant::now(), Duration::from_millis(50), 1);
    assert_eq!(monitor.get_config().quality_level, QualityLevel::High);

    run_frames(&monitor, now, Duration::from_millis(10), 30);
    assert_eq!(monitor.get_config().quality_level, QualityLevel::Ultra);

    let restores = applied
        .lock()
        .iter()
        .filter(|o| o.action == OptimizationAction::RestoreQuality)
        .count();
    assert_eq!(restores, 1);
}

/// Listener failures never reach the tick or other listeners
#[test]
fn test_faulty_listeners_are_isolated() {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    let delivered = Arc::new(AtomicUsize::new(0));

    monitor.on_fn(EventKind::PerformanceUpdate, |_| anyhow::bail!("listener failed"));
    monitor.on_fn(EventKind::PerformanceUpdate, |_| panic!("listener panicked"));
    let counter = Arc::clone(&delivered);
    monitor.on_fn(EventKind::PerformanceUpdate, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    run_frames(&monitor, Instant::now(), Duration::from_millis(16), 3);
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
    assert_eq!(monitor.generate_report().summary.total_ticks, 3);
}

/// A listener may unsubscribe itself
#[test]
fn test_listener_unsubscribes_itself() {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let id_slot = Arc::new(Mutex::new(None));

    let id = {
        let handle = monitor.clone();
        let calls = Arc::clone(&calls);
        let id_slot = Arc::clone(&id_slot);
        monitor.on_fn(EventKind::PerformanceUpdate, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_slot.lock() {
                handle.off(EventKind::PerformanceUpdate, id);
            }
            Ok(())
        })
    };
    *id_slot.lock() = Some(id);

    run_frames(&monitor, Instant::now(), Duration::from_millis(16), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.listener_count(EventKind::PerformanceUpdate), 0);
}

/// Settings loaded from disk drive the monitor
#[test]
fn test_settings_file_configures_monitor() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("monitor.toml");
    std::fs::write(
        &path,
        r#"
[monitor]
interval_ms = 250

[thresholds]
max_draw_calls = 20

[optimization]
auto_optimize = false
"#,
    )?;

    let settings = MonitorSettings::load(&path)?;
    let monitor = PerformanceMonitor::with_collaborators(
        &settings,
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    assert_eq!(monitor.default_interval(), Duration::from_millis(250));
    assert_eq!(monitor.get_thresholds().max_draw_calls, 20);

    monitor.update_model_stats(2, 0, 30, 1_000);
    run_frames(&monitor, Instant::now(), Duration::from_millis(16), 1);

    assert_eq!(
        monitor.get_optimization_suggestions(),
        vec![OptimizationAction::EnableCulling]
    );
    assert!(!monitor.get_config().culling_enabled);
    Ok(())
}

/// Reports serialize for external consumers
#[test]
fn test_report_json() -> Result<()> {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    monitor.update_model_stats(1, 0, 150, 0);
    run_frames(&monitor, Instant::now(), Duration::from_millis(16), 5);

    let json = serde_json::to_value(monitor.generate_report())?;
    assert_eq!(json["summary"]["total_ticks"], 5);
    assert_eq!(json["summary"]["level"], "poor");
    assert_eq!(json["config"]["quality_level"], "ultra");
    assert_eq!(json["config"]["culling_enabled"], true);
    assert_eq!(json["recommendations"].as_array().map(Vec::len), Some(1));
    Ok(())
}

/// Start and stop are idempotent and history is cleared on stop
#[tokio::test(start_paused = true)]
async fn test_monitoring_lifecycle() -> Result<()> {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    monitor.on_fn(EventKind::PerformanceUpdate, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    monitor.start_monitoring(Duration::from_millis(16))?;
    monitor.start_monitoring(Duration::from_millis(16))?;
    assert!(monitor.is_monitoring());

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        monitor.record_frame(clock());
    }
    assert_eq!(ticks.load(Ordering::SeqCst), 6);
    assert_eq!(monitor.get_performance_history().fps.len(), 5);

    monitor.stop_monitoring();
    monitor.stop_monitoring();
    assert!(!monitor.is_monitoring());
    assert!(monitor.get_performance_history().fps.is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 6);
    Ok(())
}

/// A healthy renderer on a slow timer is measured by its own frames
#[tokio::test(start_paused = true)]
async fn test_timer_uses_renderer_frames() -> Result<()> {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(NullRendererHooks),
        Box::new(NoMemoryProvider),
    );
    let applied = collect_applied(&monitor);
    monitor.update_model_stats(2, 0, 10, 1_000);

    monitor.start_monitoring(monitor.default_interval())?;
    let frame = Duration::from_millis(16);
    let deadline = tokio::time::Instant::now() + Duration::from_millis(3_500);
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(frame).await;
        monitor.record_frame(clock());
    }

    let metrics = monitor.get_metrics();
    assert!((metrics.fps - 62.5).abs() < 5.0, "fps = {}", metrics.fps);
    assert_eq!(monitor.get_performance_level(), PerformanceLevel::Excellent);
    assert_eq!(monitor.get_config().quality_level, QualityLevel::Ultra);
    assert!(applied.lock().is_empty());
    assert_eq!(monitor.generate_report().summary.total_ticks, 3);

    monitor.stop_monitoring();
    Ok(())
}

/// A crashing renderer hook fails only its own action and the loop keeps running
#[tokio::test(start_paused = true)]
async fn test_panicking_hook_keeps_monitor_alive() -> Result<()> {
    let monitor = PerformanceMonitor::with_collaborators(
        &MonitorSettings::default(),
        Box::new(PanickingSkipRenderer),
        Box::new(NoMemoryProvider),
    );
    let applied = collect_applied(&monitor);
    monitor.update_model_stats(2, 0, 500, 1_000);

    monitor.start_monitoring(Duration::from_millis(100))?;
    // One slow frame: 50ms -> 20 FPS
    tokio::time::sleep(Duration::from_millis(50)).await;
    monitor.record_frame(clock());
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(monitor.is_monitoring());
    assert_eq!(monitor.generate_report().summary.total_ticks, 4);

    let config = monitor.get_config();
    assert!(config.culling_enabled);
    assert!(!config.frame_skipping_enabled);
    assert_ne!(config.quality_level, QualityLevel::Ultra);

    let applied = applied.lock();
    assert!(applied
        .iter()
        .filter(|o| o.action == OptimizationAction::SkipFrames)
        .all(|o| !o.success && o.error.is_some()));
    assert!(applied
        .iter()
        .any(|o| o.action == OptimizationAction::EnableCulling && o.success));

    monitor.stop_monitoring();
    Ok(())
}
