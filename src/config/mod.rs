//! Configuration management for the monitor
//!
//! This module holds the live tuning structs (thresholds, optimization state,
//! recovery policy) and the TOML settings file that seeds them at start-up.
//! Live updates go through [`ThresholdsUpdate`] and [`ConfigUpdate`], which
//! shallow-merge into the current values and reject invalid fields one by one.

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default tick interval
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Settings file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MonitorSettings {
    /// Tick loop settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Classification-independent limits used by the advisor
    #[serde(default)]
    pub thresholds: PerformanceThresholds,

    /// Initial optimization state
    #[serde(default)]
    pub optimization: OptimizationConfig,

    /// Opt-in quality recovery
    #[serde(default)]
    pub recovery: RecoveryPolicy,
}

/// Tick loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between ticks (milliseconds)
    pub interval_ms: u64,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

/// Limits the advisor compares each snapshot against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerformanceThresholds {
    /// Frame rate floor
    pub min_fps: f64,

    /// Frame time ceiling (ms), used for the slow-frame count
    pub max_frame_time_ms: f64,

    /// Memory usage ceiling (percent of total)
    pub max_memory_usage: f64,

    /// Draw call ceiling
    pub max_draw_calls: u32,

    /// Triangle count ceiling
    pub max_triangle_count: u64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            min_fps: 30.0,
            max_frame_time_ms: 33.33,
            max_memory_usage: 80.0,
            max_draw_calls: 100,
            max_triangle_count: 100_000,
        }
    }
}

/// Partial threshold update; `None` fields keep their current value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdsUpdate {
    pub min_fps: Option<f64>,
    pub max_frame_time_ms: Option<f64>,
    pub max_memory_usage: Option<f64>,
    pub max_draw_calls: Option<u32>,
    pub max_triangle_count: Option<u64>,
}

impl PerformanceThresholds {
    /// Merges `update` field by field. Invalid values are skipped and returned.
    pub fn merge(&mut self, update: &ThresholdsUpdate) -> Vec<ConfigError> {
        let mut rejected = Vec::new();

        merge_number(&mut self.min_fps, update.min_fps, "min_fps", &mut rejected);
        merge_number(
            &mut self.max_frame_time_ms,
            update.max_frame_time_ms,
            "max_frame_time_ms",
            &mut rejected,
        );
        merge_number(
            &mut self.max_memory_usage,
            update.max_memory_usage,
            "max_memory_usage",
            &mut rejected,
        );
        if let Some(draw_calls) = update.max_draw_calls {
            self.max_draw_calls = draw_calls;
        }
        if let Some(triangles) = update.max_triangle_count {
            self.max_triangle_count = triangles;
        }

        for err in &rejected {
            warn!("⚠️ Threshold update rejected: {}", err);
        }
        rejected
    }

    /// Checks every field; used when loading a settings file
    pub fn validate(&self) -> Vec<ConfigError> {
        [
            ("min_fps", self.min_fps),
            ("max_frame_time_ms", self.max_frame_time_ms),
            ("max_memory_usage", self.max_memory_usage),
        ]
        .into_iter()
        .filter(|(_, value)| !is_valid_number(*value))
        .map(|(field, value)| ConfigError::InvalidNumber { field, value })
        .collect()
    }
}

fn is_valid_number(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn merge_number(
    target: &mut f64,
    value: Option<f64>,
    field: &'static str,
    rejected: &mut Vec<ConfigError>,
) {
    match value {
        Some(v) if is_valid_number(v) => *target = v,
        Some(v) => rejected.push(ConfigError::InvalidNumber { field, value: v }),
        None => {}
    }
}

/// Rendering quality preset, best first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Ultra,
    High,
    Medium,
    Low,
}

impl QualityLevel {
    /// One step toward `Low`, saturating
    pub fn lower(self) -> Self {
        match self {
            QualityLevel::Ultra => QualityLevel::High,
            QualityLevel::High => QualityLevel::Medium,
            QualityLevel::Medium | QualityLevel::Low => QualityLevel::Low,
        }
    }

    /// One step toward `Ultra`, saturating
    pub fn raise(self) -> Self {
        match self {
            QualityLevel::Low => QualityLevel::Medium,
            QualityLevel::Medium => QualityLevel::High,
            QualityLevel::High | QualityLevel::Ultra => QualityLevel::Ultra,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Ultra => "ultra",
            QualityLevel::High => "high",
            QualityLevel::Medium => "medium",
            QualityLevel::Low => "low",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimization state read by the renderer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Current rung of the quality ladder
    pub quality_level: QualityLevel,

    /// Skip frames under load
    pub frame_skipping_enabled: bool,

    /// Use level-of-detail models
    pub lod_enabled: bool,

    /// Cull off-screen geometry
    pub culling_enabled: bool,

    /// Compress textures
    pub texture_compression_enabled: bool,

    /// Frame rate the renderer aims for
    pub target_fps: u32,

    /// Apply suggestions automatically on Poor or Critical ticks
    pub auto_optimize: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            quality_level: QualityLevel::Ultra,
            frame_skipping_enabled: false,
            lod_enabled: false,
            culling_enabled: false,
            texture_compression_enabled: false,
            target_fps: 60,
            auto_optimize: true,
        }
    }
}

/// Partial optimization update; `None` fields keep their current value
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigUpdate {
    pub quality_level: Option<QualityLevel>,
    pub frame_skipping_enabled: Option<bool>,
    pub lod_enabled: Option<bool>,
    pub culling_enabled: Option<bool>,
    pub texture_compression_enabled: Option<bool>,
    pub target_fps: Option<u32>,
    pub auto_optimize: Option<bool>,
}

impl OptimizationConfig {
    /// Merges `update` field by field. A zero target frame rate is rejected.
    pub fn merge(&mut self, update: &ConfigUpdate) -> Vec<ConfigError> {
        let mut rejected = Vec::new();

        if let Some(level) = update.quality_level {
            self.quality_level = level;
        }
        if let Some(flag) = update.frame_skipping_enabled {
            self.frame_skipping_enabled = flag;
        }
        if let Some(flag) = update.lod_enabled {
            self.lod_enabled = flag;
        }
        if let Some(flag) = update.culling_enabled {
            self.culling_enabled = flag;
        }
        if let Some(flag) = update.texture_compression_enabled {
            self.texture_compression_enabled = flag;
        }
        match update.target_fps {
            Some(0) => rejected.push(ConfigError::Zero { field: "target_fps" }),
            Some(fps) => self.target_fps = fps,
            None => {}
        }
        if let Some(flag) = update.auto_optimize {
            self.auto_optimize = flag;
        }

        for err in &rejected {
            warn!("⚠️ Config update rejected: {}", err);
        }
        rejected
    }
}

/// Hysteresis-based quality recovery, off by default
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecoveryPolicy {
    /// Allow the optimizer to raise quality again
    pub enabled: bool,

    /// Consecutive Good-or-better ticks required before one step up
    pub sustained_ticks: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            sustained_ticks: 10,
        }
    }
}

impl MonitorSettings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let relative = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(relative)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path).with_context(|| {
            format!("Failed to read settings file: {}", expanded_path.display())
        })?;

        let settings: MonitorSettings = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse settings file: {}", expanded_path.display())
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_ms == 0 {
            anyhow::bail!("Invalid interval_ms: must be greater than zero");
        }

        if let Some(err) = self.thresholds.validate().into_iter().next() {
            anyhow::bail!("Invalid thresholds: {}", err);
        }

        if self.optimization.target_fps == 0 {
            anyhow::bail!("Invalid target_fps: must be greater than zero");
        }

        if self.recovery.enabled && self.recovery.sustained_ticks == 0 {
            anyhow::bail!("Invalid recovery.sustained_ticks: must be greater than zero");
        }

        Ok(())
    }

    /// Save settings to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents).context("Failed to write settings file")?;

        Ok(())
    }

    /// Merge partial settings into these ones.
    /// Sections of `partial` that differ from the defaults override this config.
    pub fn merge_partial(mut self, partial: MonitorSettings) -> Self {
        let default_settings = MonitorSettings::default();

        if partial.monitor != default_settings.monitor {
            self.monitor = partial.monitor;
        }
        if partial.thresholds != default_settings.thresholds {
            self.thresholds = partial.thresholds;
        }
        if partial.optimization != default_settings.optimization {
            self.optimization = partial.optimization;
        }
        if partial.recovery != default_settings.recovery {
            self.recovery = partial.recovery;
        }

        self
    }
}
