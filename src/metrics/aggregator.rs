//! Folds per-tick samples into [`PerformanceMetrics`] snapshots

use log::trace;
use std::time::Instant;

use super::memory::MemoryReading;
use super::sample_window::{SampleWindow, HISTORY_CAPACITY};
use super::{span_ms, MemoryUsage, PerformanceMetrics, SceneStats};

/// Smallest frame time ever recorded, keeps fps finite
pub const MIN_FRAME_TIME_MS: f64 = 0.001;

/// Sample history plus the latest renderer-pushed statistics
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    frame_times: SampleWindow,
    fps_history: SampleWindow,
    last_tick: Instant,
    total_ticks: u64,
    scene: SceneStats,
    render_time_ms: f64,
    update_time_ms: f64,
    memory: Option<MemoryUsage>,
    current: PerformanceMetrics,
}

impl MetricsAggregator {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_times: SampleWindow::new(HISTORY_CAPACITY),
            fps_history: SampleWindow::new(HISTORY_CAPACITY),
            last_tick: now,
            total_ticks: 0,
            scene: SceneStats::default(),
            render_time_ms: 0.0,
            update_time_ms: 0.0,
            memory: None,
            current: PerformanceMetrics::default(),
        }
    }

    /// Records one rendered frame ending at `now`
    pub fn record_frame(&mut self, now: Instant) {
        let frame_time_ms = span_ms(self.last_tick, now).max(MIN_FRAME_TIME_MS);
        self.last_tick = now;

        self.frame_times.push(frame_time_ms);
        let avg_frame_time = self.frame_times.average().unwrap_or(frame_time_ms);
        self.fps_history.push(1000.0 / avg_frame_time);
    }

    /// Refreshes the snapshot from the windows without recording a frame.
    ///
    /// With no frames recorded the previous frame rate is kept.
    pub fn snapshot(&mut self) -> PerformanceMetrics {
        self.total_ticks += 1;

        let fps = self.fps_history.latest().unwrap_or(self.current.fps);
        let frame_time_ms = self
            .frame_times
            .latest()
            .unwrap_or(self.current.frame_time_ms);

        self.current = PerformanceMetrics {
            fps,
            frame_time_ms,
            render_time_ms: self.render_time_ms,
            update_time_ms: self.update_time_ms,
            memory: self.memory,
            model_count: self.scene.model_count,
            texture_memory_bytes: self.scene.texture_memory_bytes,
            draw_calls: self.scene.draw_calls,
            triangle_count: self.scene.triangle_count,
        };

        trace!(
            "tick #{}: {:.2}ms ({:.1} FPS avg)",
            self.total_ticks,
            frame_time_ms,
            fps
        );

        self.current.clone()
    }

    /// Records a frame ending at `now` and returns the refreshed snapshot
    pub fn record_tick(&mut self, now: Instant) -> PerformanceMetrics {
        self.record_frame(now);
        self.snapshot()
    }

    /// Stores a memory reading; with a zero total the last percentage is kept
    pub fn record_memory(&mut self, reading: MemoryReading) {
        let percentage = if reading.total_bytes > 0 {
            reading.used_bytes as f64 / reading.total_bytes as f64 * 100.0
        } else {
            self.memory.map(|m| m.percentage).unwrap_or(0.0)
        };

        self.memory = Some(MemoryUsage {
            used_bytes: reading.used_bytes,
            total_bytes: reading.total_bytes,
            percentage,
        });
    }

    pub fn record_render_time(&mut self, start: Instant, end: Instant) {
        self.render_time_ms = span_ms(start, end);
    }

    pub fn record_update_time(&mut self, start: Instant, end: Instant) {
        self.update_time_ms = span_ms(start, end);
    }

    pub fn update_model_stats(&mut self, stats: SceneStats) {
        self.scene = stats;
    }

    /// Latest snapshot
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.current
    }

    pub fn frame_times(&self) -> &SampleWindow {
        &self.frame_times
    }

    pub fn fps_history(&self) -> &SampleWindow {
        &self.fps_history
    }

    /// Snapshots taken since construction or the last reset
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Clears both windows and the tick counter, restarting the frame clock at `now`
    pub fn reset(&mut self, now: Instant) {
        self.clear_history();
        self.total_ticks = 0;
        self.last_tick = now;
    }

    /// Clears both windows, keeping the tick counter
    pub fn clear_history(&mut self) {
        self.frame_times.clear();
        self.fps_history.clear();
    }
}
