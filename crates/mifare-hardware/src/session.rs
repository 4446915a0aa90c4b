//! Card polling session.
//!
//! A [`CardPollingSession`] owns an initialized [`ReaderHandle`] and waits
//! for exactly one card tap: it probes the reader at a fixed interval until a
//! non-empty UID comes back or the timeout elapses.
//!
//! # States
//!
//! ```text
//! Idle ──► Polling ──┬──► Detected
//!                    ├──► TimedOut
//!                    └──► ReaderError
//! ```
//!
//! Terminal states are final. Polling again requires a fresh session; the
//! handle can be taken back with [`CardPollingSession::into_handle`].
//!
//! # Probe failures
//!
//! A probe that errors is logged and counted as "no card yet". Only errors
//! for which [`HardwareError::is_handle_invalid`] holds end the session, with
//! [`PollOutcome::ReaderError`].
//!
//! A probe in flight is abandoned when the handle is disposed or the
//! deadline passes, so a stalled driver cannot hold the session open.
//!
//! # Examples
//!
//! ```
//! use mifare_hardware::handle::ReaderHandle;
//! use mifare_hardware::mock::MockReader;
//! use mifare_hardware::session::{CardPollingSession, PollConfig, PollOutcome};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> mifare_hardware::Result<()> {
//!     let (reader, control) = MockReader::new();
//!     control.present_card(vec![0x04, 0xA1, 0xB2, 0xC3]);
//!
//!     let handle = ReaderHandle::open(reader).await?;
//!     let config = PollConfig::new(Duration::from_millis(800), Duration::from_millis(100))?;
//!     let mut session = CardPollingSession::new(handle, config);
//!
//!     match session.poll().await? {
//!         PollOutcome::Detected { uid, .. } => assert_eq!(uid.to_hex(), "04A1B2C3"),
//!         other => panic!("unexpected outcome: {other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mifare_core::CardUid;
use mifare_core::constants::POLL_LOG_EVERY;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::error::{HardwareError, Result};
use crate::handle::{DisposeSignal, ReaderHandle};
use crate::traits::{CardReader, ConfirmationCue};

/// Timing of a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    timeout: Duration,
    interval: Duration,
}

impl PollConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` unless
    /// `0 < interval < timeout`.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(HardwareError::configuration(
                "poll timeout must be greater than zero",
            ));
        }
        if interval.is_zero() || interval >= timeout {
            return Err(HardwareError::configuration(format!(
                "poll interval must be between 0 and {}ms exclusive, got {}ms",
                timeout.as_millis(),
                interval.as_millis()
            )));
        }
        Ok(Self { timeout, interval })
    }

    /// Build from a bridge configuration.
    ///
    /// # Errors
    ///
    /// Same as [`PollConfig::new`].
    pub fn from_bridge_config(config: &mifare_core::BridgeConfig) -> Result<Self> {
        Self::new(config.poll_timeout(), config.poll_interval())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A card was read.
    Detected {
        uid: CardUid,
        timestamp: DateTime<Utc>,
    },

    /// No card within the timeout.
    TimedOut,

    /// The reader handle became unusable.
    ReaderError { message: String },
}

impl PollOutcome {
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected { .. })
    }

    /// Detection time in epoch milliseconds, for `Detected` outcomes.
    pub fn timestamp_millis(&self) -> Option<i64> {
        match self {
            Self::Detected { timestamp, .. } => Some(timestamp.timestamp_millis()),
            _ => None,
        }
    }

    fn state(&self) -> SessionState {
        match self {
            Self::Detected { .. } => SessionState::Detected,
            Self::TimedOut => SessionState::TimedOut,
            Self::ReaderError { .. } => SessionState::ReaderError,
        }
    }
}

/// Result of one probe raced against disposal and the deadline.
enum Probe {
    Done(Result<Option<CardUid>>),
    Disposed,
    Stalled,
}

/// Lifecycle state of a [`CardPollingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet polled.
    Idle,

    /// Probing the reader.
    Polling,

    /// A card was read.
    Detected,

    /// The timeout elapsed without a card.
    TimedOut,

    /// The reader handle became unusable.
    ReaderError,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Detected | Self::TimedOut | Self::ReaderError)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "Idle",
            SessionState::Polling => "Polling",
            SessionState::Detected => "Detected",
            SessionState::TimedOut => "TimedOut",
            SessionState::ReaderError => "ReaderError",
        };
        write!(f, "{}", s)
    }
}

/// Waits for a single card tap on an owned reader.
pub struct CardPollingSession<R> {
    handle: ReaderHandle<R>,
    config: PollConfig,
    cue: Option<Arc<dyn ConfirmationCue>>,
    state: SessionState,
    attempts: u32,
}

impl<R: CardReader> CardPollingSession<R> {
    pub fn new(handle: ReaderHandle<R>, config: PollConfig) -> Self {
        Self {
            handle,
            config,
            cue: None,
            state: SessionState::Idle,
            attempts: 0,
        }
    }

    /// Play `cue` when a card is detected.
    pub fn with_cue(mut self, cue: Arc<dyn ConfirmationCue>) -> Self {
        self.cue = Some(cue);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of probes issued so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Signal that disposes the owned handle from another task.
    pub fn dispose_signal(&self) -> DisposeSignal {
        self.handle.dispose_signal()
    }

    /// Take the reader handle back.
    pub fn into_handle(self) -> ReaderHandle<R> {
        self.handle
    }

    /// Poll until a card is detected, the timeout elapses or the handle
    /// becomes invalid.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidState` if the session already ran.
    /// Every other failure is reported through the returned [`PollOutcome`].
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        if self.state != SessionState::Idle {
            return Err(HardwareError::invalid_state(format!(
                "session already {}",
                self.state
            )));
        }
        self.state = SessionState::Polling;

        let started = Instant::now();
        let deadline = started + self.config.timeout;
        debug!(
            timeout_ms = self.config.timeout.as_millis() as u64,
            interval_ms = self.config.interval.as_millis() as u64,
            "Polling for card"
        );

        let disposal = self.handle.dispose_signal();
        let outcome = loop {
            if disposal.is_disposed() {
                break PollOutcome::ReaderError {
                    message: HardwareError::Disposed.to_string(),
                };
            }
            if Instant::now() >= deadline {
                debug!(attempts = self.attempts, "Read timeout, no card");
                break PollOutcome::TimedOut;
            }

            self.attempts += 1;
            let probe = tokio::select! {
                biased;
                () = disposal.disposed() => Probe::Disposed,
                result = self.handle.probe() => Probe::Done(result),
                () = sleep_until(deadline) => Probe::Stalled,
            };

            match probe {
                Probe::Done(Ok(Some(uid))) => {
                    info!(
                        uid = %uid,
                        attempt = self.attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Card detected"
                    );
                    break PollOutcome::Detected {
                        uid,
                        timestamp: Utc::now(),
                    };
                }
                Probe::Done(Ok(None)) => {
                    if self.attempts == 1 || self.attempts % POLL_LOG_EVERY == 0 {
                        debug!(attempt = self.attempts, "Waiting for card");
                    }
                }
                Probe::Done(Err(e)) if e.is_handle_invalid() => {
                    warn!(attempt = self.attempts, "Reader unusable: {}", e);
                    break PollOutcome::ReaderError {
                        message: e.to_string(),
                    };
                }
                Probe::Done(Err(e)) => {
                    warn!(attempt = self.attempts, "Probe failed: {}", e);
                }
                Probe::Disposed => {
                    debug!(attempt = self.attempts, "Disposed while probing");
                    continue;
                }
                Probe::Stalled => {
                    warn!(attempt = self.attempts, "Probe still pending at the deadline");
                    continue;
                }
            }

            let next = (Instant::now() + self.config.interval).min(deadline);
            tokio::select! {
                () = sleep_until(next) => {}
                () = disposal.disposed() => {}
            }
        };

        if outcome.is_detected() {
            self.play_cue();
        }
        self.state = outcome.state();
        Ok(outcome)
    }

    fn play_cue(&self) {
        if let Some(cue) = &self.cue
            && let Err(e) = cue.play()
        {
            warn!("Beep failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCue, MockReader};
    use rstest::rstest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[rstest]
    #[case(0, 0)]
    #[case(800, 0)]
    #[case(800, 800)]
    #[case(800, 900)]
    fn test_poll_config_rejects_invalid(#[case] timeout: u64, #[case] interval: u64) {
        let err = PollConfig::new(ms(timeout), ms(interval)).unwrap_err();
        assert!(matches!(err, HardwareError::ConfigurationError { .. }));
    }

    #[test]
    fn test_poll_config_from_bridge_config() {
        let config = PollConfig::from_bridge_config(&mifare_core::BridgeConfig::default()).unwrap();
        assert_eq!(config.timeout(), ms(8000));
        assert_eq!(config.interval(), ms(100));
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Polling.is_terminal());
        assert!(SessionState::Detected.is_terminal());
        assert!(SessionState::TimedOut.is_terminal());
        assert!(SessionState::ReaderError.is_terminal());
        assert_eq!(SessionState::TimedOut.to_string(), "TimedOut");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_is_single_use() {
        let (reader, control) = MockReader::new();
        control.present_card(vec![0x01]);
        let handle = ReaderHandle::open(reader).await.unwrap();

        let mut session = CardPollingSession::new(handle, PollConfig::new(ms(500), ms(50)).unwrap());
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.poll().await.unwrap().is_detected());
        assert_eq!(session.state(), SessionState::Detected);

        let err = session.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::InvalidState { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cue_plays_once_on_detection() {
        let (reader, control) = MockReader::new();
        control.queue_empty_reads(2);
        control.present_card(vec![0x0A, 0x0B]);
        let cue = Arc::new(MockCue::new());

        let handle = ReaderHandle::open(reader).await.unwrap();
        let mut session = CardPollingSession::new(handle, PollConfig::new(ms(500), ms(50)).unwrap())
            .with_cue(cue.clone());

        let outcome = session.poll().await.unwrap();
        assert!(outcome.is_detected());
        assert!(outcome.timestamp_millis().is_some());
        assert_eq!(cue.play_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cue_not_played_on_timeout() {
        let (reader, _control) = MockReader::new();
        let cue = Arc::new(MockCue::new());

        let handle = ReaderHandle::open(reader).await.unwrap();
        let mut session = CardPollingSession::new(handle, PollConfig::new(ms(300), ms(100)).unwrap())
            .with_cue(cue.clone());

        assert_eq!(session.poll().await.unwrap(), PollOutcome::TimedOut);
        assert_eq!(session.state(), SessionState::TimedOut);
        assert!(session.poll().await.is_err());
        assert_eq!(cue.play_count(), 0);
        assert_eq!(PollOutcome::TimedOut.timestamp_millis(), None);
    }
}
