//! Performance metrics collection
//!
//! Raw per-tick samples are folded into [`PerformanceMetrics`] snapshots by the
//! [`MetricsAggregator`]. Scene statistics and timings are pushed in by the
//! renderer between ticks and copied into the next snapshot.

pub mod aggregator;
pub mod memory;
pub mod sample_window;

pub use aggregator::{MetricsAggregator, MIN_FRAME_TIME_MS};
pub use memory::{MemoryProvider, MemoryReading, NoMemoryProvider, ProcMemoryProvider};
pub use sample_window::{SampleWindow, HISTORY_CAPACITY};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Optimistic frame rate reported before the first tick
pub const DEFAULT_FPS: f64 = 60.0;

/// Point-in-time performance snapshot, recreated every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Frames per second, `1000 / average frame time`
    pub fps: f64,

    /// Duration of the most recent frame (ms)
    pub frame_time_ms: f64,

    /// Last reported render pass duration (ms)
    pub render_time_ms: f64,

    /// Last reported scene update duration (ms)
    pub update_time_ms: f64,

    /// Process memory, `None` when the host cannot report it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,

    /// Active character models
    pub model_count: u32,

    /// Texture memory held by the scene (bytes)
    pub texture_memory_bytes: u64,

    /// Draw calls issued last frame
    pub draw_calls: u32,

    /// Triangles across active models
    pub triangle_count: u64,
}

impl PerformanceMetrics {
    /// Memory usage percentage, 0 when unknown
    pub fn memory_percentage(&self) -> f64 {
        self.memory.map(|m| m.percentage).unwrap_or(0.0)
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            frame_time_ms: 1000.0 / DEFAULT_FPS,
            render_time_ms: 0.0,
            update_time_ms: 0.0,
            memory: None,
            model_count: 0,
            texture_memory_bytes: 0,
            draw_calls: 0,
            triangle_count: 0,
        }
    }
}

/// Process memory usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
    /// `used / total * 100`
    pub percentage: f64,
}

/// Scene statistics pushed by the renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStats {
    pub model_count: u32,
    pub texture_memory_bytes: u64,
    pub draw_calls: u32,
    pub triangle_count: u64,
}

/// Helper for measuring render and update spans
pub struct FrameTimer {
    start: Instant,
}

impl FrameTimer {
    /// Starts a new timer
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Instant the timer was started
    pub fn started_at(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

/// Milliseconds between two instants, zero if `end` precedes `start`
pub(crate) fn span_ms(start: Instant, end: Instant) -> f64 {
    end.saturating_duration_since(start).as_secs_f64() * 1000.0
}
