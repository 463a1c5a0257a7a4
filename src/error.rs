//! Error types for the monitor.
//!
//! None of these are fatal: configuration errors cause the offending field to
//! keep its previous value, and optimization errors are reported through the
//! `optimization_applied` event while the rest of the batch carries on.
//! Only starting the tick loop can fail outright.

use thiserror::Error;

use crate::analysis::OptimizationAction;

/// A rejected configuration or threshold value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {value} (must be a finite, non-negative number)")]
    InvalidNumber { field: &'static str, value: f64 },

    #[error("invalid value for `{field}`: must be greater than zero")]
    Zero { field: &'static str },
}

impl ConfigError {
    /// Name of the field that was rejected
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::InvalidNumber { field, .. } | ConfigError::Zero { field } => field,
        }
    }
}

/// Failure applying a single optimization action
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizationError {
    #[error("{action} is not supported by the renderer")]
    Unsupported { action: OptimizationAction },

    #[error("renderer rejected {action}: {reason}")]
    Rejected {
        action: OptimizationAction,
        reason: String,
    },

    #[error("renderer panicked while applying {action}")]
    Panicked { action: OptimizationAction },
}

/// Monitor lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("monitoring requires a running tokio runtime")]
    NoRuntime,

    #[error("tick interval must be greater than zero")]
    ZeroInterval,
}
