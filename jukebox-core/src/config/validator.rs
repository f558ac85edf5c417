//! Configuration validation.

use crate::config::types::{DownloadConfig, MessageConfig, ProximityConfig, TrackerConfig};
use crate::error::{Error, Result};

/// Validator for tracker configurations.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates a tracker configuration.
    pub fn validate(&self, config: &TrackerConfig) -> Result<()> {
        self.validate_messages(&config.messages)?;
        self.validate_proximity(&config.proximity)?;
        self.validate_downloads(&config.downloads)?;
        Ok(())
    }

    fn validate_messages(&self, messages: &MessageConfig) -> Result<()> {
        if messages.distance.is_nan() || messages.distance <= 0.0 {
            return Err(Error::ConfigValidation(
                "messages.distance".to_string(),
                "Message distance must be positive".to_string(),
            ));
        }
        if messages.fade_ticks > messages.sticky_ticks {
            return Err(Error::ConfigValidation(
                "messages.fade_ticks".to_string(),
                format!(
                    "Fade ({} ticks) cannot outlast the sticky lifetime ({} ticks)",
                    messages.fade_ticks, messages.sticky_ticks
                ),
            ));
        }
        Ok(())
    }

    fn validate_proximity(&self, proximity: &ProximityConfig) -> Result<()> {
        if proximity.radius.is_nan() || proximity.radius < 0.0 {
            return Err(Error::ConfigValidation(
                "proximity.radius".to_string(),
                "Radius cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_downloads(&self, downloads: &DownloadConfig) -> Result<()> {
        if downloads.timeout_secs == 0 {
            return Err(Error::ConfigValidation(
                "downloads.timeout_secs".to_string(),
                "Timeout must be positive".to_string(),
            ));
        }
        if downloads.max_stream_bytes == 0 {
            return Err(Error::ConfigValidation(
                "downloads.max_stream_bytes".to_string(),
                "Stream buffer cap cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
