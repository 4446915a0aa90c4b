//! Reader hardware layer for the MIFARE bridge.
//!
//! This crate defines the fixed driver contract for ISO 14443A readers and
//! the session that waits for a card tap on top of it.
//!
//! # Overview
//!
//! - [`CardReader`]: the driver interface a hardware adapter implements
//!   (`initialize`, `probe_for_card`, `reader_info`, `release`).
//! - [`ConfirmationCue`]: the audible beep played after a successful read.
//! - [`ReaderHandle`]: exclusive owner of an initialized reader, with a
//!   disposal signal that makes further probes fail fast.
//! - [`CardPollingSession`]: probes at a fixed interval until a UID is read
//!   or the timeout elapses.
//!
//! ```no_run
//! use mifare_hardware::{CardPollingSession, PollConfig, PollOutcome, ReaderHandle};
//! use mifare_hardware::traits::CardReader;
//! use std::time::Duration;
//!
//! async fn wait_for_tap<R: CardReader>(reader: R) -> mifare_hardware::Result<Option<String>> {
//!     let handle = ReaderHandle::open(reader).await?;
//!     let config = PollConfig::new(Duration::from_secs(8), Duration::from_millis(100))?;
//!     let mut session = CardPollingSession::new(handle, config);
//!
//!     let uid = match session.poll().await? {
//!         PollOutcome::Detected { uid, .. } => Some(uid.to_hex()),
//!         _ => None,
//!     };
//!     session.into_handle().release().await?;
//!     Ok(uid)
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with [`HardwareError`].
//! A polling session absorbs probe errors unless
//! [`HardwareError::is_handle_invalid`] says the reader is gone.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a scriptable reader and a counting cue for
//! development and tests without physical hardware.
//!
//! [`CardReader`]: traits::CardReader
//! [`ConfirmationCue`]: traits::ConfirmationCue

pub mod devices;
pub mod error;
pub mod handle;
pub mod mock;
pub mod session;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyCardReader;
pub use error::{HardwareError, Result};
pub use handle::{DisposeSignal, ReaderHandle};
pub use session::{CardPollingSession, PollConfig, PollOutcome, SessionState};
pub use traits::{CardReader, ConfirmationCue};
pub use types::{ReaderInfo, ToneSpec};
