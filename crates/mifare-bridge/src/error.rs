//! Errors reported across the method channel.

use mifare_core::ErrorCode;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failures of a bridge call.
///
/// Every variant maps to one channel [`ErrorCode`]; nothing here is fatal
/// to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A read was attempted before `initialize`.
    #[error("{}", mifare_core::constants::messages::NOT_INITIALIZED)]
    NotInitialized,

    /// The reader could not be created or initialized.
    #[error("{0}")]
    Initialization(String),

    /// No card was read.
    #[error("{0}")]
    Read(String),

    /// The bridge configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Channel error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::Initialization(_) | Self::Config(_) => ErrorCode::InitError,
            Self::Read(_) => ErrorCode::ReadError,
        }
    }
}

impl From<mifare_core::Error> for BridgeError {
    fn from(e: mifare_core::Error) -> Self {
        Self::Config(e.to_string())
    }
}
