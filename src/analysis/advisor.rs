//! Maps a snapshot and thresholds to an ordered list of suggested actions

use super::OptimizationAction;
use crate::config::PerformanceThresholds;
use crate::metrics::PerformanceMetrics;

/// Suggests actions for every threshold the snapshot violates.
///
/// Order is fixed (frame rate, memory, draw calls, triangles) and each action
/// appears at most once. Empty when everything is within bounds.
pub fn suggest(
    metrics: &PerformanceMetrics,
    thresholds: &PerformanceThresholds,
) -> Vec<OptimizationAction> {
    let mut actions = Vec::new();

    if metrics.fps < thresholds.min_fps {
        push_unique(&mut actions, OptimizationAction::ReduceQuality);
        push_unique(&mut actions, OptimizationAction::SkipFrames);
    }

    if metrics.memory_percentage() > thresholds.max_memory_usage {
        push_unique(&mut actions, OptimizationAction::CompressTextures);
        push_unique(&mut actions, OptimizationAction::ReduceModelCount);
    }

    if metrics.draw_calls > thresholds.max_draw_calls {
        push_unique(&mut actions, OptimizationAction::EnableCulling);
    }

    if metrics.triangle_count > thresholds.max_triangle_count {
        push_unique(&mut actions, OptimizationAction::ReduceQuality);
    }

    actions
}

fn push_unique(actions: &mut Vec<OptimizationAction>, action: OptimizationAction) {
    if !actions.contains(&action) {
        actions.push(action);
    }
}
