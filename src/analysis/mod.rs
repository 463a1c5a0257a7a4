//! Classification and optimization advice
//!
//! Both halves are pure functions of a [`PerformanceMetrics`] snapshot, so they
//! can be called any number of times with the same input and give the same
//! answer.
//!
//! [`PerformanceMetrics`]: crate::metrics::PerformanceMetrics

pub mod advisor;
pub mod classifier;

pub use advisor::suggest;
pub use classifier::classify;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete performance rating, ordered best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl PerformanceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Fair => "fair",
            PerformanceLevel::Poor => "poor",
            PerformanceLevel::Critical => "critical",
        }
    }

    /// Poor or Critical, the levels that trigger automatic optimization
    pub fn needs_optimization(&self) -> bool {
        *self >= PerformanceLevel::Poor
    }
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single quality-control step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationAction {
    /// Step the quality ladder down once
    ReduceQuality,
    /// Enable frame skipping
    SkipFrames,
    /// Enable texture compression
    CompressTextures,
    /// Ask the renderer to drop models; no internal state change
    ReduceModelCount,
    /// Enable culling
    EnableCulling,
    /// Ask the renderer to simplify physics; no internal state change
    ReducePhysics,
    /// Step the quality ladder up once (recovery policy only)
    RestoreQuality,
}

impl OptimizationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationAction::ReduceQuality => "reduce_quality",
            OptimizationAction::SkipFrames => "skip_frames",
            OptimizationAction::CompressTextures => "compress_textures",
            OptimizationAction::ReduceModelCount => "reduce_model_count",
            OptimizationAction::EnableCulling => "enable_culling",
            OptimizationAction::ReducePhysics => "reduce_physics",
            OptimizationAction::RestoreQuality => "restore_quality",
        }
    }

    /// Human-readable recommendation shown in reports
    pub fn recommendation(&self) -> &'static str {
        match self {
            OptimizationAction::ReduceQuality => {
                "Lower the rendering quality preset to recover frame rate"
            }
            OptimizationAction::SkipFrames => {
                "Enable frame skipping to keep animation in sync under load"
            }
            OptimizationAction::CompressTextures => {
                "Compress textures to reduce memory pressure"
            }
            OptimizationAction::ReduceModelCount => {
                "Reduce the number of active character models"
            }
            OptimizationAction::EnableCulling => {
                "Enable culling to cut draw calls for off-screen geometry"
            }
            OptimizationAction::ReducePhysics => "Simplify physics simulation for secondary motion",
            OptimizationAction::RestoreQuality => {
                "Performance has been stable; quality can be raised again"
            }
        }
    }
}

impl fmt::Display for OptimizationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
