//! # Quality Monitor
//!
//! Real-time performance monitoring with an adaptive quality-control loop for
//! character renderers.
//!
//! ## Architecture
//!
//! The monitor is a small pipeline run once per tick:
//! - `metrics`: bounded sample windows and the per-tick snapshot
//! - `analysis`: performance level classification and optimization advice
//! - `optimizer`: applies advice to the renderer's quality config
//! - `events`: typed publish/subscribe hub for monitor events
//! - `report`: summary reports over the sample history
//! - `monitor`: the controller that owns the tick loop
//! - `config`: settings file parsing and validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quality_monitor::{EventKind, MonitorEvent, MonitorSettings, PerformanceMonitor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = MonitorSettings::default();
//!     let monitor = PerformanceMonitor::new(&settings);
//!
//!     monitor.on_fn(EventKind::PerformanceUpdate, |event| {
//!         if let MonitorEvent::PerformanceUpdate(update) = event {
//!             println!("{:.1} FPS ({})", update.metrics.fps, update.level);
//!         }
//!         Ok(())
//!     });
//!
//!     monitor.start_monitoring(settings.monitor.interval())?;
//!
//!     // The renderer reports every finished frame
//!     for _ in 0..300 {
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!         monitor.record_frame(std::time::Instant::now());
//!     }
//!     println!("{}", monitor.generate_report());
//!     monitor.cleanup();
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod monitor;
pub mod optimizer;
pub mod report;

// Re-export main types for easy access
pub use analysis::{OptimizationAction, PerformanceLevel};
pub use config::{
    ConfigUpdate, MonitorSettings, OptimizationConfig, PerformanceThresholds, QualityLevel,
    RecoveryPolicy, ThresholdsUpdate,
};
pub use error::{ConfigError, MonitorError, OptimizationError};
pub use events::{
    EventHub, EventKind, Listener, ListenerId, MonitorEvent, OptimizationApplied,
    PerformanceUpdate,
};
pub use metrics::{
    FrameTimer, MemoryProvider, MemoryReading, PerformanceMetrics, ProcMemoryProvider, SceneStats,
};
pub use monitor::{PerformanceHistory, PerformanceMonitor};
pub use optimizer::{AutoOptimizer, NullRendererHooks, RendererHooks};
pub use report::{PerformanceReport, ReportSummary};

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
