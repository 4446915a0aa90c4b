//! Hardware device trait definitions.
//!
//! These traits are the fixed contract between the polling session and the
//! reader hardware. A driver adapter for a concrete reader implements
//! [`CardReader`]; which adapter is used is decided when the bridge is built,
//! never discovered at runtime.
//!
//! Reader methods return `impl Future + Send` so that a session can be moved
//! onto a worker task. Implementations are free to write them as plain
//! `async fn`.

use std::future::Future;

use crate::error::Result;
use crate::types::ReaderInfo;

/// Trait for ISO 14443A contactless card readers.
///
/// # Lifecycle
///
/// 1. [`initialize`](CardReader::initialize) once before anything else
/// 2. [`probe_for_card`](CardReader::probe_for_card) any number of times
/// 3. [`release`](CardReader::release) when done; the reader is unusable afterwards
///
/// # Examples
///
/// ```
/// use mifare_hardware::traits::CardReader;
/// use mifare_hardware::Result;
///
/// async fn first_uid<R: CardReader>(reader: &mut R) -> Result<Option<Vec<u8>>> {
///     reader.initialize().await?;
///     let uid = reader.probe_for_card().await?;
///     reader.release().await?;
///     Ok(uid)
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Power up and configure the reader.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the hardware is
    /// missing or misconfigured.
    fn initialize(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run one card-detection probe.
    ///
    /// Returns `Ok(None)` (or an empty buffer) when no card is in the field.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disconnected` or `HardwareError::Disposed`
    /// when the reader can no longer be used. Other errors describe a single
    /// failed attempt.
    fn probe_for_card(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Describe the reader.
    fn reader_info(&self) -> impl Future<Output = Result<ReaderInfo>> + Send;

    /// Free the hardware.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver failed to release; callers log and
    /// continue.
    fn release(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Audible confirmation played after a successful read.
///
/// Cues are fire-and-forget: `play` must return promptly and callers only
/// log its errors.
pub trait ConfirmationCue: Send + Sync {
    /// Start the confirmation tone.
    fn play(&self) -> Result<()>;

    /// Free the audio resource. Later `play` calls may fail.
    fn release(&self) -> Result<()>;
}
