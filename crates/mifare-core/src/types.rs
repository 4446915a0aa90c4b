use crate::{Result, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier broadcast by a contactless card.
///
/// A `CardUid` always holds at least one byte: empty reads mean "no card yet"
/// and never reach this type. On the wire it travels as an uppercase hex
/// string (`04A1B2C3`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardUid(Vec<u8>);

impl CardUid {
    /// Create a UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::EmptyUid` if `bytes` is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::EmptyUid);
        }
        Ok(CardUid(bytes))
    }

    /// Build a UID from an optional probe result.
    ///
    /// `None` and empty buffers both mean nothing was detected.
    #[must_use]
    pub fn from_probe(bytes: Option<Vec<u8>>) -> Option<Self> {
        bytes.and_then(|b| Self::new(b).ok())
    }

    /// Parse a UID from its hex form. Both cases are accepted.
    ///
    /// # Errors
    /// Returns `Error::InvalidHex` for odd-length input or non-hex digits and
    /// `Error::EmptyUid` for an empty string.
    pub fn from_hex(digits: &str) -> Result<Self> {
        Self::new(decode_hex(digits)?)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uppercase hex rendering used for transport.
    #[must_use]
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for CardUid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<CardUid> for String {
    fn from(uid: CardUid) -> Self {
        uid.to_hex()
    }
}

impl AsRef<[u8]> for CardUid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Render bytes as uppercase hex, two digits per byte.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

/// Decode a hex string into bytes. Both cases are accepted.
///
/// # Errors
/// Returns `Error::InvalidHex` for odd-length input or non-hex digits.
pub fn decode_hex(digits: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(digits)?)
}

/// Error codes reported to the host shell.
///
/// The string forms are part of the channel contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// An operation was attempted before `initialize`.
    NotInitialized,

    /// No card was read: timeout, busy reader or reader failure.
    ReadError,

    /// The reader could not be brought up.
    InitError,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::ReadError => "READ_ERROR",
            ErrorCode::InitError => "INIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
