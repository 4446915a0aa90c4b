//! Mock ISO 14443A reader for testing and development.
//!
//! The reader answers probes from a script controlled through a
//! [`MockReaderControl`]. Scripted steps are consumed first, one per probe;
//! once the script is empty every probe reports the card currently in the
//! field, if any.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{HardwareError, Result};
use crate::traits::CardReader;
use crate::types::ReaderInfo;

/// Mock reader for testing and development.
///
/// # Examples
///
/// ```
/// use mifare_hardware::mock::MockReader;
/// use mifare_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> mifare_hardware::Result<()> {
///     let (mut reader, control) = MockReader::new();
///     reader.initialize().await?;
///
///     control.queue_empty_reads(1);
///     control.present_card(vec![0x04, 0xAB, 0xCD, 0xEF]);
///
///     assert_eq!(reader.probe_for_card().await?, None);
///     assert_eq!(reader.probe_for_card().await?, Some(vec![0x04, 0xAB, 0xCD, 0xEF]));
///     assert_eq!(control.probe_count(), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    name: String,
    state: Arc<Mutex<MockState>>,
}

/// One scripted probe response.
#[derive(Debug, Clone)]
enum ProbeStep {
    Empty,
    Card(Vec<u8>),
    Fail(String),
    Disconnect,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<ProbeStep>,
    field: Option<Vec<u8>>,
    init_failure: Option<String>,
    release_failure: Option<String>,
    initialized: bool,
    released: bool,
    init_count: usize,
    probe_count: usize,
    release_count: usize,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns the reader and a control handle for scripting it.
    pub fn new() -> (Self, MockReaderControl) {
        Self::with_name("Mock ISO14443A Reader")
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockReaderControl) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let reader = Self {
            name: name.into(),
            state: Arc::clone(&state),
        };
        (reader, MockReaderControl { state })
    }
}

impl CardReader for MockReader {
    async fn initialize(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.init_count += 1;
        if let Some(message) = state.init_failure.clone() {
            return Err(HardwareError::initialization_failed(message));
        }
        state.initialized = true;
        state.released = false;
        Ok(())
    }

    async fn probe_for_card(&mut self) -> Result<Option<Vec<u8>>> {
        let mut state = lock(&self.state);
        if state.released || !state.initialized {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        state.probe_count += 1;

        match state.script.pop_front() {
            Some(ProbeStep::Empty) => Ok(None),
            Some(ProbeStep::Card(uid)) => Ok(Some(uid)),
            Some(ProbeStep::Fail(message)) => Err(HardwareError::card_read(message)),
            Some(ProbeStep::Disconnect) => Err(HardwareError::disconnected(self.name.clone())),
            None => Ok(state.field.clone()),
        }
    }

    async fn reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone(), vec!["ISO14443A".to_string()])
            .with_firmware_version("mock"))
    }

    async fn release(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.release_count += 1;
        state.released = true;
        state.initialized = false;
        match state.release_failure.clone() {
            Some(message) => Err(HardwareError::communication(message)),
            None => Ok(()),
        }
    }
}

/// Handle for scripting a [`MockReader`].
///
/// Clones share the same reader.
#[derive(Debug, Clone)]
pub struct MockReaderControl {
    state: Arc<Mutex<MockState>>,
}

impl MockReaderControl {
    /// Place a card in the field. It is reported by every unscripted probe
    /// until removed.
    pub fn present_card(&self, uid: Vec<u8>) {
        lock(&self.state).field = Some(uid);
    }

    /// Take the card out of the field.
    pub fn remove_card(&self) {
        lock(&self.state).field = None;
    }

    /// Script `count` probes that see nothing.
    pub fn queue_empty_reads(&self, count: usize) {
        let mut state = lock(&self.state);
        state
            .script
            .extend(std::iter::repeat_n(ProbeStep::Empty, count));
    }

    /// Script a single probe that sees `uid`. An empty `uid` models a
    /// driver returning a zero-length buffer.
    pub fn queue_card(&self, uid: Vec<u8>) {
        lock(&self.state).script.push_back(ProbeStep::Card(uid));
    }

    /// Script a single probe that fails with a transient read error.
    pub fn fail_next_probe(&self, message: impl Into<String>) {
        lock(&self.state)
            .script
            .push_back(ProbeStep::Fail(message.into()));
    }

    /// Script a single probe that reports the reader as disconnected.
    pub fn disconnect_next_probe(&self) {
        lock(&self.state).script.push_back(ProbeStep::Disconnect);
    }

    /// Make every `initialize` call fail.
    pub fn fail_init(&self, message: impl Into<String>) {
        lock(&self.state).init_failure = Some(message.into());
    }

    /// Make every `release` call fail (the reader is still marked released).
    pub fn fail_release(&self, message: impl Into<String>) {
        lock(&self.state).release_failure = Some(message.into());
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }

    pub fn init_count(&self) -> usize {
        lock(&self.state).init_count
    }

    /// Number of probes that reached the hardware.
    pub fn probe_count(&self) -> usize {
        lock(&self.state).probe_count
    }

    pub fn release_count(&self) -> usize {
        lock(&self.state).release_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reader_requires_init() {
        let (mut reader, control) = MockReader::new();
        assert!(matches!(
            reader.probe_for_card().await,
            Err(HardwareError::Disconnected { .. })
        ));
        assert_eq!(control.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_reader_script_then_field() {
        let (mut reader, control) = MockReader::new();
        reader.initialize().await.unwrap();

        control.queue_empty_reads(2);
        control.fail_next_probe("collision");
        control.present_card(vec![0x01, 0x02, 0x03, 0x04]);

        assert_eq!(reader.probe_for_card().await.unwrap(), None);
        assert_eq!(reader.probe_for_card().await.unwrap(), None);
        assert!(matches!(
            reader.probe_for_card().await,
            Err(HardwareError::CardReadError { .. })
        ));
        assert_eq!(
            reader.probe_for_card().await.unwrap(),
            Some(vec![0x01, 0x02, 0x03, 0x04])
        );

        control.remove_card();
        assert_eq!(reader.probe_for_card().await.unwrap(), None);
        assert_eq!(control.probe_count(), 5);
    }

    #[tokio::test]
    async fn test_mock_reader_init_failure() {
        let (mut reader, control) = MockReader::new();
        control.fail_init("no SAM");

        let err = reader.initialize().await.unwrap_err();
        assert_eq!(err.to_string(), "Initialization failed: no SAM");
        assert!(!control.is_initialized());
        assert_eq!(control.init_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_reader_release() {
        let (mut reader, control) = MockReader::new();
        reader.initialize().await.unwrap();
        reader.release().await.unwrap();

        assert!(control.is_released());
        assert!(!control.is_initialized());
        assert!(reader.probe_for_card().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_reader_release_failure_still_releases() {
        let (mut reader, control) = MockReader::new();
        control.fail_release("power rail stuck");
        reader.initialize().await.unwrap();

        assert!(reader.release().await.is_err());
        assert!(control.is_released());
    }

    #[tokio::test]
    async fn test_mock_reader_info() {
        let (reader, _control) = MockReader::with_name("Test Reader");
        let info = reader.reader_info().await.unwrap();
        assert_eq!(info.name, "Test Reader");
        assert!(info.supports("ISO14443A"));
    }
}
