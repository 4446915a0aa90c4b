//! Reader lifecycle behind the method channel.
//!
//! # Lifecycle
//!
//! ```text
//!                initialize                 readCard
//! Uninitialized ───────────► Ready ◄──────────────────► Reading
//!       ▲                      │                           │
//!       └──── disposeReader ───┴───────────────────────────┘
//! ```
//!
//! A `readCard` moves the reader handle into a [`CardPollingSession`] on a
//! worker task. The worker hands the handle back when the session settles,
//! or releases it if the bridge was disposed (or re-initialized) meanwhile.
//! Disposing during a read cancels the session through the handle's
//! [`DisposeSignal`] and waits for the worker to release the reader, so the
//! hardware is free by the time `disposeReader` answers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use mifare_core::BridgeConfig;
use mifare_core::constants::{messages, methods};
use mifare_hardware::{
    CardPollingSession, CardReader, ConfirmationCue, DisposeSignal, HardwareError, PollConfig,
    PollOutcome, ReaderHandle, ToneSpec,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::channel::{MethodCall, MethodResponse};
use crate::error::{BridgeError, Result};
use crate::events::TagEvent;

/// Creates a fresh, uninitialized reader driver.
pub type ReaderFactory<R> = Box<dyn FnMut() -> mifare_hardware::Result<R> + Send>;

/// Creates the confirmation cue for the configured tone.
pub type CueFactory =
    Box<dyn FnMut(ToneSpec) -> mifare_hardware::Result<Arc<dyn ConfirmationCue>> + Send>;

/// Successful `readCard` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRead {
    /// Uppercase hex UID.
    pub uid: String,

    /// Detection time, epoch milliseconds.
    pub timestamp: i64,
}

impl From<CardRead> for Value {
    fn from(read: CardRead) -> Self {
        json!({ "uid": read.uid, "timestamp": read.timestamp })
    }
}

enum ReaderSlot<R> {
    Uninitialized,
    Ready(ReaderHandle<R>),
    Reading {
        signal: DisposeSignal,
        /// Completes once the worker has returned or released the handle.
        settled: oneshot::Receiver<()>,
    },
}

struct BridgeState<R> {
    slot: ReaderSlot<R>,
    cue: Option<Arc<dyn ConfirmationCue>>,
    reader_factory: ReaderFactory<R>,
    cue_factory: Option<CueFactory>,
    /// Bumped on every successful initialize; a worker only returns its
    /// handle to the generation it was started from.
    generation: u64,
}

impl<R> BridgeState<R> {
    fn create_cue(&mut self, tone: ToneSpec) {
        let Some(factory) = self.cue_factory.as_mut() else {
            return;
        };
        match factory(tone) {
            Ok(cue) => self.cue = Some(cue),
            Err(e) => error!("ToneGenerator init failed: {}", e),
        }
    }
}

struct Inner<R> {
    poll: PollConfig,
    tone: ToneSpec,
    channel: String,
    state: Mutex<BridgeState<R>>,
    events: broadcast::Sender<TagEvent>,
}

impl<R: CardReader + 'static> Inner<R> {
    /// Give a settled session's handle back, or release it if the bridge
    /// moved on while the read was in flight.
    async fn return_handle(&self, handle: ReaderHandle<R>, generation: u64) {
        let mut state = self.state.lock().await;
        let current = matches!(state.slot, ReaderSlot::Reading { .. })
            && state.generation == generation
            && !handle.is_disposed();

        if current {
            state.slot = ReaderSlot::Ready(handle);
        } else {
            drop(state);
            release_quietly(handle).await;
        }
    }

    /// Recover from a worker that never returned its handle.
    async fn abandon_read(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if matches!(state.slot, ReaderSlot::Reading { .. }) && state.generation == generation {
            state.slot = ReaderSlot::Uninitialized;
        }
    }
}

async fn release_quietly<R: CardReader>(handle: ReaderHandle<R>) {
    if let Err(e) = handle.release().await {
        warn!("Reader release failed: {}", e);
    }
}

/// Owner of the reader lifecycle behind the method channel.
///
/// Cheap to clone; clones share the same reader.
pub struct ReaderBridge<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for ReaderBridge<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: CardReader + 'static> ReaderBridge<R> {
    /// Start building a bridge for `config`.
    pub fn builder(config: BridgeConfig) -> ReaderBridgeBuilder<R> {
        ReaderBridgeBuilder {
            config,
            reader_factory: None,
            cue_factory: None,
        }
    }

    /// Channel name the host binds to.
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Listen for tag events. Each successful read is delivered once to
    /// every receiver subscribed at that moment.
    pub fn subscribe_tags(&self) -> broadcast::Receiver<TagEvent> {
        self.inner.events.subscribe()
    }

    pub async fn is_initialized(&self) -> bool {
        !matches!(
            self.inner.state.lock().await.slot,
            ReaderSlot::Uninitialized
        )
    }

    /// Dispatch a method call by name.
    pub async fn handle(&self, call: &MethodCall) -> MethodResponse {
        debug!(method = %call.method, "Method call");
        match call.method.as_str() {
            methods::INITIALIZE => self.initialize().await.into(),
            methods::READ_CARD => self.read_card().await.into(),
            methods::DISPOSE_READER => MethodResponse::success(self.dispose_reader().await),
            other => {
                debug!(method = other, "Method not implemented");
                MethodResponse::NotImplemented
            }
        }
    }

    /// Bring up the reader. Returns `true` right away if it is already up.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Initialization` if the driver cannot be created
    /// or fails to initialize.
    pub async fn initialize(&self) -> Result<bool> {
        let mut state = self.inner.state.lock().await;
        if !matches!(state.slot, ReaderSlot::Uninitialized) {
            return Ok(true);
        }

        let reader = (state.reader_factory)().map_err(|e| {
            error!("Failed to get ISO14443A reader instance: {}", e);
            BridgeError::Initialization(e.to_string())
        })?;

        let handle = ReaderHandle::open(reader).await.map_err(|e| {
            error!("Reader init failed: {}", e);
            match e {
                HardwareError::InitializationFailed { .. } => {
                    BridgeError::Initialization(format!("{}: {}", messages::INIT_FAILED, e))
                }
                other => BridgeError::Initialization(other.to_string()),
            }
        })?;

        state.generation += 1;
        state.slot = ReaderSlot::Ready(handle);
        if state.cue.is_none() {
            state.create_cue(self.inner.tone);
        }

        info!(generation = state.generation, "MIFARE reader initialized successfully");
        Ok(true)
    }

    /// Wait for a card tap and return its UID.
    ///
    /// The poll runs on its own task; this future only awaits the outcome.
    ///
    /// # Errors
    ///
    /// - `BridgeError::NotInitialized` before `initialize` or after dispose
    /// - `BridgeError::Read` on timeout, while another read is in flight, or
    ///   when the reader fails or is disposed mid-read
    pub async fn read_card(&self) -> Result<CardRead> {
        let (session, generation, settled_tx) = {
            let mut state = self.inner.state.lock().await;
            let generation = state.generation;
            let (settled_tx, settled) = oneshot::channel();

            let handle = match std::mem::replace(&mut state.slot, ReaderSlot::Uninitialized) {
                ReaderSlot::Ready(handle) => handle,
                ReaderSlot::Uninitialized => return Err(BridgeError::NotInitialized),
                busy @ ReaderSlot::Reading { .. } => {
                    state.slot = busy;
                    return Err(BridgeError::Read(messages::READER_BUSY.to_string()));
                }
            };

            state.slot = ReaderSlot::Reading {
                signal: handle.dispose_signal(),
                settled,
            };

            let mut session = CardPollingSession::new(handle, self.inner.poll);
            if let Some(cue) = &state.cue {
                session = session.with_cue(Arc::clone(cue));
            }
            (session, generation, settled_tx)
        };

        let inner = Arc::clone(&self.inner);
        let worker = tokio::spawn(async move {
            let mut session = session;
            let polled = AssertUnwindSafe(session.poll()).catch_unwind().await;
            let handle = session.into_handle();

            let outcome = match polled {
                Ok(outcome) => {
                    inner.return_handle(handle, generation).await;
                    outcome.map_err(|e| BridgeError::Read(e.to_string()))
                }
                Err(_) => {
                    error!("Card polling panicked, releasing reader");
                    inner.abandon_read(generation).await;
                    release_quietly(handle).await;
                    Err(BridgeError::Read("card polling panicked".to_string()))
                }
            };
            // Nobody waits when no dispose is pending.
            let _ = settled_tx.send(());
            outcome
        });

        let outcome = match worker.await {
            Ok(outcome) => outcome?,
            Err(e) => {
                error!("readCard worker failed, reader handle lost: {}", e);
                self.inner.abandon_read(generation).await;
                return Err(BridgeError::Read(e.to_string()));
            }
        };

        match outcome {
            PollOutcome::Detected { uid, timestamp } => {
                let read = CardRead {
                    uid: uid.to_hex(),
                    timestamp: timestamp.timestamp_millis(),
                };
                // No listeners is fine.
                let _ = self.inner.events.send(TagEvent::new(uid, timestamp));
                Ok(read)
            }
            PollOutcome::TimedOut => Err(BridgeError::Read(messages::NO_CARD.to_string())),
            PollOutcome::ReaderError { message } => {
                error!("readCard error: {}", message);
                Err(BridgeError::Read(message))
            }
        }
    }

    /// Release the reader and the audio cue. Always returns `true`.
    ///
    /// Safe to call any number of times. Release failures are logged. A read
    /// in flight is cancelled, and this waits until its worker has released
    /// the reader.
    pub async fn dispose_reader(&self) -> bool {
        let (slot, cue) = {
            let mut state = self.inner.state.lock().await;
            let slot = std::mem::replace(&mut state.slot, ReaderSlot::Uninitialized);
            (slot, state.cue.take())
        };

        if let Some(cue) = cue
            && let Err(e) = cue.release()
        {
            warn!("ToneGenerator release failed: {}", e);
        }

        match slot {
            ReaderSlot::Ready(handle) => release_quietly(handle).await,
            ReaderSlot::Reading { signal, settled } => {
                debug!("Disposing during a read, waiting for the worker");
                signal.dispose();
                if settled.await.is_err() {
                    warn!("readCard worker ended without settling");
                }
            }
            ReaderSlot::Uninitialized => {}
        }

        info!("MIFARE reader disposed");
        true
    }
}

/// Builder for [`ReaderBridge`].
pub struct ReaderBridgeBuilder<R> {
    config: BridgeConfig,
    reader_factory: Option<ReaderFactory<R>>,
    cue_factory: Option<CueFactory>,
}

impl<R: CardReader + 'static> ReaderBridgeBuilder<R> {
    /// Driver factory, called on every `initialize` that finds no reader.
    pub fn reader_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut() -> mifare_hardware::Result<R> + Send + 'static,
    {
        self.reader_factory = Some(Box::new(factory));
        self
    }

    /// Cue factory, called once at build time and again on `initialize`
    /// after a dispose. Without one, reads are silent.
    pub fn cue_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut(ToneSpec) -> mifare_hardware::Result<Arc<dyn ConfirmationCue>> + Send + 'static,
    {
        self.cue_factory = Some(Box::new(factory));
        self
    }

    /// Validate the configuration and build the bridge.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` for an invalid configuration or a
    /// missing reader factory.
    pub fn build(self) -> Result<ReaderBridge<R>> {
        self.config.validate()?;
        let poll = PollConfig::from_bridge_config(&self.config)
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        let reader_factory = self
            .reader_factory
            .ok_or_else(|| BridgeError::Config("no reader factory configured".to_string()))?;
        let tone = ToneSpec::new(self.config.beep_duration(), self.config.beep_volume);

        let mut state = BridgeState {
            slot: ReaderSlot::Uninitialized,
            cue: None,
            reader_factory,
            cue_factory: self.cue_factory,
            generation: 0,
        };
        state.create_cue(tone);

        let (events, _) = broadcast::channel(self.config.tag_event_capacity);

        Ok(ReaderBridge {
            inner: Arc::new(Inner {
                poll,
                tone,
                channel: self.config.channel,
                state: Mutex::new(state),
                events,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mifare_hardware::mock::{MockCue, MockReader, MockReaderControl};

    fn bridge() -> (ReaderBridge<MockReader>, MockReaderControl) {
        let (reader, control) = MockReader::new();
        let mut reader = Some(reader);
        let bridge = ReaderBridge::builder(BridgeConfig::default())
            .reader_factory(move || {
                reader
                    .take()
                    .ok_or_else(|| HardwareError::other("reader already taken"))
            })
            .build()
            .unwrap();
        (bridge, control)
    }

    #[test]
    fn test_build_requires_reader_factory() {
        let result = ReaderBridge::<MockReader>::builder(BridgeConfig::default()).build();
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = BridgeConfig {
            poll_interval_ms: 9000,
            ..BridgeConfig::default()
        };
        let result = ReaderBridge::builder(config)
            .reader_factory(|| Ok(MockReader::new().0))
            .build();
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[tokio::test]
    async fn test_channel_name_from_config() {
        let (bridge, _control) = bridge();
        assert_eq!(bridge.channel(), mifare_core::constants::DEFAULT_CHANNEL);
    }

    #[tokio::test]
    async fn test_initialize_twice_uses_one_reader() {
        let (bridge, control) = bridge();
        assert!(bridge.initialize().await.unwrap());
        assert!(bridge.initialize().await.unwrap());
        assert_eq!(control.init_count(), 1);
        assert!(bridge.is_initialized().await);
    }

    #[tokio::test]
    async fn test_cue_factory_failure_is_not_fatal() {
        let (reader, control) = MockReader::new();
        control.present_card(vec![0x42]);
        let mut reader = Some(reader);
        let bridge = ReaderBridge::builder(BridgeConfig::default())
            .reader_factory(move || reader.take().ok_or_else(|| HardwareError::other("taken")))
            .cue_factory(|_| Err(HardwareError::audio("no audio device")))
            .build()
            .unwrap();

        bridge.initialize().await.unwrap();
        let read = bridge.read_card().await.unwrap();
        assert_eq!(read.uid, "42");
    }

    #[tokio::test]
    async fn test_cue_receives_configured_tone() {
        let config = BridgeConfig {
            beep_duration_ms: 250,
            beep_volume: 40,
            ..BridgeConfig::default()
        };
        let seen = Arc::new(std::sync::Mutex::new(None));
        let seen_in_factory = Arc::clone(&seen);

        let _bridge = ReaderBridge::builder(config)
            .reader_factory(|| Ok(MockReader::new().0))
            .cue_factory(move |tone| {
                *seen_in_factory.lock().unwrap() = Some(tone);
                Ok(Arc::new(MockCue::with_tone(tone)) as Arc<dyn ConfirmationCue>)
            })
            .build()
            .unwrap();

        let tone = (*seen.lock().unwrap()).expect("cue factory not called");
        assert_eq!(tone.duration, std::time::Duration::from_millis(250));
        assert_eq!(tone.volume, 40);
    }

    #[test]
    fn test_card_read_to_value() {
        let value = Value::from(CardRead {
            uid: "04A1B2C3".to_string(),
            timestamp: 1_760_601_600_000,
        });
        assert_eq!(value, json!({"uid": "04A1B2C3", "timestamp": 1_760_601_600_000i64}));
    }
}
