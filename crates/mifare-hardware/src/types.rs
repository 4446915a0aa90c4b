//! Common types shared across reader and cue implementations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reader information.
///
/// Logged once after initialization so field reports show exactly which
/// reader and firmware were in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Reader name (e.g., "C66 ISO14443A").
    pub name: String,

    /// List of supported protocols (e.g., ["ISO14443A"]).
    pub protocols: Vec<String>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, protocols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            protocols,
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }

    /// Whether the reader advertises the given protocol.
    pub fn supports(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p.eq_ignore_ascii_case(protocol))
    }
}

/// Confirmation tone settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneSpec {
    /// How long the tone plays.
    pub duration: Duration,

    /// Volume, 0-100.
    pub volume: u8,
}

impl ToneSpec {
    pub fn new(duration: Duration, volume: u8) -> Self {
        Self {
            duration,
            volume: volume.min(mifare_core::constants::MAX_BEEP_VOLUME),
        }
    }
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(mifare_core::constants::DEFAULT_BEEP_DURATION_MS),
            mifare_core::constants::DEFAULT_BEEP_VOLUME,
        )
    }
}
