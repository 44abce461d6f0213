//! Animation error types

use crate::animation::AnimationId;
use thiserror::Error;

/// Errors raised while building or advancing animations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// Invalid construction parameters (rejected before anything runs)
    #[error("Invalid animation configuration: {0}")]
    Configuration(String),

    /// A value computation produced NaN or infinity
    #[error("Value {index} produced a non-finite result ({value})")]
    NonFinite { index: usize, value: f32 },

    /// An explicit id was requested that is still registered
    #[error("Animation id {0} is already registered")]
    IdInUse(AnimationId),

    /// The controller behind a handle has been dropped
    #[error("Animation controller is no longer running")]
    ControllerClosed,

    /// The background worker thread could not be spawned
    #[error("Failed to start animation thread: {0}")]
    Thread(String),
}

impl AnimationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        AnimationError::Configuration(msg.into())
    }

    /// True for errors discovered while ticking rather than at construction
    pub fn is_runtime(&self) -> bool {
        matches!(self, AnimationError::NonFinite { .. })
    }

    /// Attribute a non-finite error to slot `index` of a multi-value animation
    pub(crate) fn at_index(self, index: usize) -> Self {
        match self {
            AnimationError::NonFinite { value, .. } => AnimationError::NonFinite { index, value },
            other => other,
        }
    }
}

/// Errors raised while loading a controller configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed fine but holds an unusable value
    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AnimationError {
    fn from(err: ConfigError) -> Self {
        AnimationError::Configuration(err.to_string())
    }
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;

/// Reject NaN and infinite construction parameters
pub(crate) fn ensure_finite(name: &str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnimationError::config(format!("{name} must be finite, got {value}")))
    }
}

/// Reject non-finite values produced while ticking
pub(crate) fn check_output(index: usize, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnimationError::NonFinite { index, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("start", 1.5), Ok(1.5));
        assert!(matches!(
            ensure_finite("start", f32::NAN),
            Err(AnimationError::Configuration(_))
        ));
        assert!(ensure_finite("end", f32::INFINITY).is_err());
    }

    #[test]
    fn test_runtime_classification() {
        assert!(AnimationError::NonFinite {
            index: 0,
            value: f32::NAN
        }
        .is_runtime());
        assert!(!AnimationError::config("bad").is_runtime());
        assert!(!AnimationError::ControllerClosed.is_runtime());
    }

    #[test]
    fn test_config_error_converts() {
        let err: AnimationError = ConfigError::Invalid("frame_rate".into()).into();
        assert!(matches!(err, AnimationError::Configuration(msg) if msg.contains("frame_rate")));
    }

    #[test]
    fn test_check_output_reports_index() {
        let err = check_output(3, f32::INFINITY).unwrap_err();
        assert_eq!(
            err,
            AnimationError::NonFinite {
                index: 3,
                value: f32::INFINITY
            }
        );
    }
}
