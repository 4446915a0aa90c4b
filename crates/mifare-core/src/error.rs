use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Card data errors
    #[error("Card UID must not be empty")]
    EmptyUid,

    #[error("Invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
