//! Controller configuration
//!
//! Controllers read their tick rate, frame-rate window and callback policies
//! from a [`ControllerConfig`]. Every field has a default, so a TOML file only
//! needs the keys it changes:
//!
//! ```toml
//! frame_rate = 120
//! callback_context = "owner"
//! teardown = "notify_cancelled"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::frame_rate::DEFAULT_WINDOW;

/// Where completion callbacks of a background controller run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackContext {
    /// On the animation worker thread, right after the pulse
    #[default]
    Worker,
    /// Queued until the owner calls `dispatch_pending()`
    Owner,
}

/// What still-running animations observe when their animator is dropped
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownPolicy {
    /// Drop callbacks without calling them
    #[default]
    Silent,
    /// Call every pending callback with `Outcome::Cancelled`
    NotifyCancelled,
}

/// Settings shared by every controller
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Ticks per second requested from the driver or worker thread
    pub frame_rate: u32,
    /// Intervals averaged by the frame-rate estimate
    pub frame_window: usize,
    pub callback_context: CallbackContext,
    pub teardown: TeardownPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            frame_window: DEFAULT_WINDOW,
            callback_context: CallbackContext::default(),
            teardown: TeardownPolicy::default(),
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn frame_window(mut self, window: usize) -> Self {
        self.frame_window = window;
        self
    }

    pub fn callback_context(mut self, context: CallbackContext) -> Self {
        self.callback_context = context;
        self
    }

    pub fn teardown(mut self, policy: TeardownPolicy) -> Self {
        self.teardown = policy;
        self
    }

    /// Nominal time between ticks
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frame_rate.max(1)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate == 0 || self.frame_rate > 1_000 {
            return Err(ConfigError::Invalid(format!(
                "frame_rate must be between 1 and 1000, got {}",
                self.frame_rate
            )));
        }
        if self.frame_window == 0 {
            return Err(ConfigError::Invalid("frame_window must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
