//! Automatic quality degradation
//!
//! The [`AutoOptimizer`] is the only writer of [`OptimizationConfig`]. Each
//! suggested action is offered to the renderer through [`RendererHooks`]
//! before it is committed, so a renderer that cannot honour an action (say,
//! no texture compression on this GPU) refuses it without touching the
//! config. Failures are per action, a panicking hook included: the rest of the
//! batch is still applied.
//!
//! Quality only moves down the ladder unless a [`RecoveryPolicy`] is enabled,
//! in which case a sustained run of Good-or-better ticks raises it one step.

use log::{debug, info, warn};
use std::panic::{self, AssertUnwindSafe};

use crate::analysis::{OptimizationAction, PerformanceLevel};
use crate::config::{ConfigUpdate, OptimizationConfig, QualityLevel, RecoveryPolicy};
use crate::error::{ConfigError, OptimizationError};
use crate::events::OptimizationApplied;

/// Renderer-side handling of optimization actions.
///
/// Called with the config as it would be after the action. Returning an error
/// leaves the config untouched. Implementations must not call back into the
/// monitor.
#[cfg_attr(test, mockall::automock)]
pub trait RendererHooks: Send {
    fn apply_optimization(
        &mut self,
        action: OptimizationAction,
        config: &OptimizationConfig,
    ) -> Result<(), OptimizationError>;
}

/// Accepts every action
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRendererHooks;

impl RendererHooks for NullRendererHooks {
    fn apply_optimization(
        &mut self,
        _action: OptimizationAction,
        _config: &OptimizationConfig,
    ) -> Result<(), OptimizationError> {
        Ok(())
    }
}

/// Owner of the optimization config
pub struct AutoOptimizer {
    config: OptimizationConfig,
    hooks: Box<dyn RendererHooks>,
    recovery: RecoveryPolicy,
    good_streak: u32,
}

impl AutoOptimizer {
    pub fn new(config: OptimizationConfig, hooks: Box<dyn RendererHooks>) -> Self {
        Self {
            config,
            hooks,
            recovery: RecoveryPolicy::default(),
            good_streak: 0,
        }
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    /// Copy of the current config
    pub fn config(&self) -> OptimizationConfig {
        self.config
    }

    pub fn recovery(&self) -> RecoveryPolicy {
        self.recovery
    }

    pub fn set_recovery(&mut self, recovery: RecoveryPolicy) {
        self.recovery = recovery;
        self.good_streak = 0;
    }

    /// Shallow-merges an external update into the config
    pub fn update_config(&mut self, update: &ConfigUpdate) -> Vec<ConfigError> {
        self.config.merge(update)
    }

    /// Steps the quality ladder down once. Returns false at `Low`.
    pub fn reduce_quality(&mut self) -> bool {
        let next = self.config.quality_level.lower();
        let changed = next != self.config.quality_level;
        self.config.quality_level = next;
        changed
    }

    /// Applies each action independently, returning one outcome per action
    pub fn apply(&mut self, actions: &[OptimizationAction]) -> Vec<OptimizationApplied> {
        actions
            .iter()
            .map(|&action| self.apply_one(action))
            .collect()
    }

    fn apply_one(&mut self, action: OptimizationAction) -> OptimizationApplied {
        let candidate = transition(self.config, action);

        let hooks = &mut self.hooks;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            hooks.apply_optimization(action, &candidate)
        }))
        .unwrap_or(Err(OptimizationError::Panicked { action }));

        match result {
            Ok(()) => {
                if candidate != self.config {
                    info!(
                        "🔧 Auto-optimization: {} (quality: {} -> {})",
                        action, self.config.quality_level, candidate.quality_level
                    );
                } else {
                    debug!("🔧 Auto-optimization: {} (no config change)", action);
                }
                self.config = candidate;
                OptimizationApplied {
                    action,
                    success: true,
                    error: None,
                    config: self.config,
                }
            }
            Err(e) => {
                warn!("⚠️ Auto-optimization {} failed: {}", action, e);
                OptimizationApplied {
                    action,
                    success: false,
                    error: Some(e.to_string()),
                    config: self.config,
                }
            }
        }
    }

    /// Feeds one tick's level to the recovery policy.
    ///
    /// Returns the restore outcome when a step up was attempted.
    pub fn observe_level(&mut self, level: PerformanceLevel) -> Option<OptimizationApplied> {
        if !self.recovery.enabled {
            return None;
        }

        if level > PerformanceLevel::Good {
            self.good_streak = 0;
            return None;
        }

        self.good_streak = self.good_streak.saturating_add(1);
        if self.good_streak < self.recovery.sustained_ticks.max(1) {
            return None;
        }

        self.good_streak = 0;
        if self.config.quality_level == QualityLevel::Ultra {
            return None;
        }

        Some(self.apply_one(OptimizationAction::RestoreQuality))
    }
}

/// Config after `action`, without side effects
fn transition(mut config: OptimizationConfig, action: OptimizationAction) -> OptimizationConfig {
    match action {
        OptimizationAction::ReduceQuality => config.quality_level = config.quality_level.lower(),
        OptimizationAction::RestoreQuality => config.quality_level = config.quality_level.raise(),
        OptimizationAction::SkipFrames => config.frame_skipping_enabled = true,
        OptimizationAction::CompressTextures => config.texture_compression_enabled = true,
        OptimizationAction::EnableCulling => config.culling_enabled = true,
        // Scene content belongs to the renderer
        OptimizationAction::ReduceModelCount | OptimizationAction::ReducePhysics => {}
    }
    config
}
