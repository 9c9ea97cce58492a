//! JSON application config.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "window": { "width": 800 }, "fixed_time_step": 0.01 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::DEFAULT_FIXED_TIME_STEP;
use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use crate::window::WindowCreationInfo;

/// Settings an application reads at launch. Missing fields keep their
/// defaults; unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowCreationInfo,
    /// Seconds per fixed-update tick.
    pub fixed_time_step: f32,
    /// Linear RGBA the renderer clears to every frame.
    pub clear_color: [f64; 4],
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowCreationInfo::default(),
            fixed_time_step: DEFAULT_FIXED_TIME_STEP,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse and [`validate`](Self::validate) a config document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` and parse it. Errors name the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read '{}': {e}", path.display())))?;
        let config = Self::from_json(&text)
            .map_err(|e| Error::Config(format!("'{}': {e}", path.display())))?;
        log::info!("loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject a non-positive or non-finite step and a zero window size.
    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_time_step.is_finite() && self.fixed_time_step > 0.0) {
            return Err(Error::Config(format!(
                "fixed_time_step must be positive, got {}",
                self.fixed_time_step
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
