//! Error types for the motion engine.
//!
//! Two families exist: validation failures raised synchronously while an
//! animation is registered, and computation failures raised by a model while
//! a tick is running. Neither is retried by the core.

use serde::{Deserialize, Serialize};

/// A bad animation definition, transform or configuration value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("Duration must be greater than 0")]
    NonPositiveDuration { duration: f64 },

    #[error("Ping-pong requires loop to be enabled")]
    PingPongWithoutLoop,

    #[error("Unknown model type: {model}")]
    UnknownModelType { model: String },

    #[error("Missing parameter '{name}' for model {model}")]
    MissingParameter { model: String, name: String },

    #[error("Invalid parameter '{name}' for model {model}: {reason}")]
    InvalidParameter {
        model: String,
        name: String,
        reason: String,
    },

    #[error("Invalid keyframes: {reason}")]
    InvalidKeyframes { reason: String },

    #[error("Invalid transform: {reason}")]
    InvalidTransform { reason: String },

    #[error("Invalid tick rate: {rate} (must be within (0, {max}])")]
    InvalidTickRate { rate: f64, max: f64 },
}

/// A model could not produce a finite position.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ComputationError {
    #[error("Model {model} produced a non-finite position at t={time}")]
    NonFinite { model: String, time: f64 },

    #[error("Degenerate geometry in model {model}: {reason}")]
    DegenerateGeometry { model: String, reason: String },
}

/// Top-level error for the motion engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MotionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl MotionError {
    /// Get error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Computation(_) => "computation",
            Self::Serialization { .. } => "serialization",
        }
    }
}

impl ValidationError {
    pub(crate) fn invalid(model: &str, name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            model: model.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MotionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}
