//! Error types for reader hardware operations.
//!
//! This module defines the failures a reader driver or audio cue can report.
//! The polling session uses [`HardwareError::is_handle_invalid`] to decide
//! whether a failed probe ends the session or is simply retried on the next
//! tick.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The reader handle was released; no further calls are possible.
    #[error("Reader handle disposed")]
    Disposed,

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Card reading error.
    #[error("Card read error: {message}")]
    CardReadError { message: String },

    /// Audio cue could not be created or played.
    #[error("Audio error: {message}")]
    AudioError { message: String },

    /// Operation not allowed in the current lifecycle state.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new card read error.
    pub fn card_read(message: impl Into<String>) -> Self {
        Self::CardReadError {
            message: message.into(),
        }
    }

    /// Create a new audio error.
    pub fn audio(message: impl Into<String>) -> Self {
        Self::AudioError {
            message: message.into(),
        }
    }

    /// Create a new invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Whether the error means the reader handle itself is unusable.
    ///
    /// Such errors end a polling session immediately; every other probe
    /// failure is treated as "no card yet".
    #[must_use]
    pub fn is_handle_invalid(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Disposed)
    }
}
