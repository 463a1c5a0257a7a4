//! Rule ladder mapping a snapshot to a [`PerformanceLevel`]

use super::PerformanceLevel;
use crate::metrics::PerformanceMetrics;

/// One rung of the ladder: all bounds must hold for the level to apply
struct Band {
    level: PerformanceLevel,
    min_fps: f64,
    max_memory_pct: f64,
    max_draw_calls: Option<u32>,
}

/// Evaluated top-down, first match wins. Bounds on memory and draw calls are exclusive.
const BANDS: [Band; 4] = [
    Band {
        level: PerformanceLevel::Excellent,
        min_fps: 55.0,
        max_memory_pct: 70.0,
        max_draw_calls: Some(50),
    },
    Band {
        level: PerformanceLevel::Good,
        min_fps: 45.0,
        max_memory_pct: 80.0,
        max_draw_calls: Some(70),
    },
    Band {
        level: PerformanceLevel::Fair,
        min_fps: 30.0,
        max_memory_pct: 90.0,
        max_draw_calls: Some(90),
    },
    Band {
        level: PerformanceLevel::Poor,
        min_fps: 20.0,
        max_memory_pct: 95.0,
        max_draw_calls: None,
    },
];

impl Band {
    fn matches(&self, fps: f64, memory_pct: f64, draw_calls: u32) -> bool {
        fps >= self.min_fps
            && memory_pct < self.max_memory_pct
            && self.max_draw_calls.map_or(true, |max| draw_calls < max)
    }
}

/// Classifies a snapshot. A missing memory reading counts as 0%.
pub fn classify(metrics: &PerformanceMetrics) -> PerformanceLevel {
    let memory_pct = metrics.memory_percentage();

    BANDS
        .iter()
        .find(|band| band.matches(metrics.fps, memory_pct, metrics.draw_calls))
        .map(|band| band.level)
        .unwrap_or(PerformanceLevel::Critical)
}
