//! Bridge configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields a working configuration tuned for the handheld reader.
//!
//! ```
//! use mifare_core::BridgeConfig;
//!
//! let config = BridgeConfig::from_json(r#"{ "poll_timeout_ms": 5000 }"#).unwrap();
//! assert_eq!(config.poll_timeout_ms, 5000);
//! assert_eq!(config.poll_interval_ms, 100);
//! ```

use crate::constants::{
    DEFAULT_BEEP_DURATION_MS, DEFAULT_BEEP_VOLUME, DEFAULT_CHANNEL, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_TIMEOUT_MS, DEFAULT_TAG_EVENT_CAPACITY, MAX_BEEP_VOLUME,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings for the reader bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Method channel name the host shell binds to.
    pub channel: String,

    /// How long a single `readCard` waits for a tap.
    pub poll_timeout_ms: u64,

    /// Fixed delay between detection probes.
    pub poll_interval_ms: u64,

    /// Confirmation beep length.
    pub beep_duration_ms: u64,

    /// Confirmation beep volume (0-100).
    pub beep_volume: u8,

    /// Tag events buffered per subscriber before the oldest are dropped.
    pub tag_event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            beep_duration_ms: DEFAULT_BEEP_DURATION_MS,
            beep_volume: DEFAULT_BEEP_VOLUME,
            tag_event_capacity: DEFAULT_TAG_EVENT_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    /// Returns `Error::ConfigParse` for malformed JSON or unknown keys and
    /// `Error::Config` when a value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, otherwise the same
    /// errors as [`BridgeConfig::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(Error::Config("channel must not be empty".to_string()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(Error::Config(
                "poll_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= self.poll_timeout_ms {
            return Err(Error::Config(format!(
                "poll_interval_ms must be in 1..{}, got {}",
                self.poll_timeout_ms, self.poll_interval_ms
            )));
        }
        if self.beep_volume > MAX_BEEP_VOLUME {
            return Err(Error::Config(format!(
                "beep_volume must be 0-{MAX_BEEP_VOLUME}, got {}",
                self.beep_volume
            )));
        }
        if self.tag_event_capacity == 0 {
            return Err(Error::Config(
                "tag_event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn beep_duration(&self) -> Duration {
        Duration::from_millis(self.beep_duration_ms)
    }
}
