//! Enum wrapper for reader dispatch.
//!
//! Reader futures are returned as `impl Future` from [`CardReader`], which
//! rules out `Box<dyn CardReader>`. [`AnyCardReader`] gives the bridge a
//! single concrete type while the driver adapter stays a build-time choice.
//!
//! # Examples
//!
//! ```
//! use mifare_hardware::devices::AnyCardReader;
//! use mifare_hardware::mock::MockReader;
//! use mifare_hardware::traits::CardReader;
//!
//! #[tokio::main]
//! async fn main() -> mifare_hardware::Result<()> {
//!     let (reader, _control) = MockReader::new();
//!     let any_reader = AnyCardReader::Mock(reader);
//!
//!     let info = any_reader.reader_info().await?;
//!     println!("Reader: {}", info.name);
//!     Ok(())
//! }
//! ```

use crate::mock::MockReader;
use crate::traits::CardReader;
use crate::{ReaderInfo, Result};

/// Enum wrapper for card reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCardReader {
    /// Mock reader for development and testing.
    Mock(MockReader),
}

impl From<MockReader> for AnyCardReader {
    fn from(reader: MockReader) -> Self {
        Self::Mock(reader)
    }
}

impl CardReader for AnyCardReader {
    async fn initialize(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.initialize().await,
        }
    }

    async fn probe_for_card(&mut self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Mock(device) => device.probe_for_card().await,
        }
    }

    async fn reader_info(&self) -> Result<ReaderInfo> {
        match self {
            Self::Mock(device) => device.reader_info().await,
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(device) => device.release().await,
        }
    }
}
