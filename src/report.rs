//! Performance reports
//!
//! A report is a read-only summary of the sample windows plus the current
//! suggestions translated into readable recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{classify, suggest, PerformanceLevel};
use crate::config::{OptimizationConfig, PerformanceThresholds};
use crate::metrics::MetricsAggregator;

/// Summary statistics over the current history window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub average_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub average_frame_time_ms: f64,
    /// Ticks since the last stats reset
    pub total_ticks: u64,
    /// Frames in the window slower than `max_frame_time_ms`
    pub slow_frames: usize,
    pub level: PerformanceLevel,
}

/// Full report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub summary: ReportSummary,
    pub recommendations: Vec<String>,
    pub config: OptimizationConfig,
}

/// Builds a report from the current state without mutating it
pub fn generate_report(
    aggregator: &MetricsAggregator,
    thresholds: &PerformanceThresholds,
    config: OptimizationConfig,
) -> PerformanceReport {
    let metrics = aggregator.metrics();
    let fps = aggregator.fps_history();
    let frame_times = aggregator.frame_times();

    let summary = ReportSummary {
        average_fps: fps.average().unwrap_or(0.0),
        min_fps: fps.min().unwrap_or(0.0),
        max_fps: fps.max().unwrap_or(0.0),
        average_frame_time_ms: frame_times.average().unwrap_or(0.0),
        total_ticks: aggregator.total_ticks(),
        slow_frames: frame_times.count_above(thresholds.max_frame_time_ms),
        level: classify(metrics),
    };

    let recommendations = suggest(metrics, thresholds)
        .iter()
        .map(|action| action.recommendation().to_string())
        .collect();

    PerformanceReport {
        summary,
        recommendations,
        config,
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "Performance: {}", s.level)?;
        writeln!(
            f,
            "  FPS: avg {:.1} / min {:.1} / max {:.1}",
            s.average_fps, s.min_fps, s.max_fps
        )?;
        writeln!(f, "  Frame time: avg {:.2}ms", s.average_frame_time_ms)?;
        writeln!(f, "  Ticks: {} ({} slow)", s.total_ticks, s.slow_frames)?;
        writeln!(
            f,
            "  Quality: {} (skip frames: {}, culling: {}, texture compression: {}, LOD: {})",
            self.config.quality_level,
            self.config.frame_skipping_enabled,
            self.config.culling_enabled,
            self.config.texture_compression_enabled,
            self.config.lod_enabled
        )?;
        if self.recommendations.is_empty() {
            writeln!(f, "  No recommendations")?;
        } else {
            writeln!(f, "  Recommendations:")?;
            for rec in &self.recommendations {
                writeln!(f, "    - {}", rec)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OptimizationAction;
    use crate::metrics::SceneStats;
    use std::time::{Duration, Instant};

    #[test]
    fn test_empty_report() {
        let agg = MetricsAggregator::new(Instant::now());
        let report = generate_report(
            &agg,
            &PerformanceThresholds::default(),
            OptimizationConfig::default(),
        );

        assert_eq!(report.summary.total_ticks, 0);
        assert_eq!(report.summary.average_fps, 0.0);
        assert_eq!(report.summary.slow_frames, 0);
        assert_eq!(report.summary.level, PerformanceLevel::Excellent);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_summary_statistics() {
        let start = Instant::now();
        let mut agg = MetricsAggregator::new(start);
        // 10ms, 30ms, 50ms frames
        agg.record_tick(start + Duration::from_millis(10));
        agg.record_tick(start + Duration::from_millis(40));
        agg.record_tick(start + Duration::from_millis(90));

        let report = generate_report(
            &agg,
            &PerformanceThresholds::default(),
            OptimizationConfig::default(),
        );
        let s = &report.summary;

        assert_eq!(s.total_ticks, 3);
        assert!((s.average_frame_time_ms - 30.0).abs() < 1e-6);
        // fps window: 100, 50, 33.3
        assert!((s.max_fps - 100.0).abs() < 1e-6);
        assert!((s.min_fps - 1000.0 / 30.0).abs() < 1e-6);
        assert!((s.average_fps - (100.0 + 50.0 + 1000.0 / 30.0) / 3.0).abs() < 1e-6);
        assert_eq!(s.slow_frames, 1);
    }

    #[test]
    fn test_recommendations_follow_suggestions() {
        let start = Instant::now();
        let mut agg = MetricsAggregator::new(start);
        agg.update_model_stats(SceneStats {
            draw_calls: 150,
            ..Default::default()
        });
        agg.record_tick(start + Duration::from_millis(16));

        let report = generate_report(
            &agg,
            &PerformanceThresholds::default(),
            OptimizationConfig::default(),
        );
        assert_eq!(
            report.recommendations,
            vec![OptimizationAction::EnableCulling.recommendation().to_string()]
        );
        assert_eq!(report.summary.level, PerformanceLevel::Poor);
    }

    #[test]
    fn test_report_is_pure() {
        let start = Instant::now();
        let mut agg = MetricsAggregator::new(start);
        agg.record_tick(start + Duration::from_millis(20));

        let thresholds = PerformanceThresholds::default();
        let first = generate_report(&agg, &thresholds, OptimizationConfig::default());
        let second = generate_report(&agg, &thresholds, OptimizationConfig::default());
        assert_eq!(first, second);
        assert_eq!(agg.total_ticks(), 1);
    }

    #[test]
    fn test_display() {
        let agg = MetricsAggregator::new(Instant::now());
        let report = generate_report(
            &agg,
            &PerformanceThresholds::default(),
            OptimizationConfig::default(),
        );
        let text = report.to_string();
        assert!(text.contains("Performance: excellent"));
        assert!(text.contains("Quality: ultra"));
        assert!(text.contains("No recommendations"));
    }
}
