//! Integration tests for the reader bridge lifecycle and channel contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mifare_bridge::{BridgeError, MethodCall, MethodResponse, ReaderBridge};
use mifare_core::{BridgeConfig, ErrorCode};
use mifare_hardware::mock::{MockCue, MockReader, MockReaderControl};
use mifare_hardware::{CardReader, ConfirmationCue, HardwareError, ReaderInfo};

/// Bridge whose factory hands out fresh mock readers; every reader it
/// created is recorded so tests can script and inspect it.
struct Fixture {
    bridge: ReaderBridge<MockReader>,
    readers: Arc<Mutex<Vec<MockReaderControl>>>,
    cue: MockCue,
}

impl Fixture {
    fn new(config: BridgeConfig) -> Self {
        Self::with_reader_setup(config, |_| {})
    }

    fn with_reader_setup(
        config: BridgeConfig,
        setup: impl Fn(&MockReaderControl) + Send + 'static,
    ) -> Self {
        let readers = Arc::new(Mutex::new(Vec::new()));
        let created = Arc::clone(&readers);
        let cue = MockCue::new();
        let cue_for_bridge = cue.clone();

        let bridge = ReaderBridge::builder(config)
            .reader_factory(move || {
                let (reader, control) = MockReader::new();
                setup(&control);
                created.lock().unwrap().push(control);
                Ok(reader)
            })
            .cue_factory(move |_| Ok(Arc::new(cue_for_bridge.clone()) as Arc<dyn ConfirmationCue>))
            .build()
            .unwrap();

        Self {
            bridge,
            readers,
            cue,
        }
    }

    fn reader(&self, index: usize) -> MockReaderControl {
        self.readers.lock().unwrap()[index].clone()
    }

    fn reader_count(&self) -> usize {
        self.readers.lock().unwrap().len()
    }
}

fn fast_config() -> BridgeConfig {
    BridgeConfig {
        poll_timeout_ms: 800,
        poll_interval_ms: 100,
        ..BridgeConfig::default()
    }
}

#[tokio::test]
async fn read_before_initialize_is_not_initialized() {
    let fixture = Fixture::new(fast_config());

    let err = fixture.bridge.read_card().await.unwrap_err();
    assert_eq!(err, BridgeError::NotInitialized);

    let response = fixture.bridge.handle(&MethodCall::new("readCard")).await;
    assert_eq!(response.error_code(), Some(ErrorCode::NotInitialized));
    assert_eq!(fixture.reader_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn read_returns_uid_and_timestamp() {
    let fixture = Fixture::with_reader_setup(fast_config(), |control| {
        control.queue_empty_reads(2);
        control.queue_card(vec![0x04, 0xA1, 0xB2, 0xC3]);
    });
    let before = chrono::Utc::now().timestamp_millis();

    assert!(fixture.bridge.initialize().await.unwrap());
    let read = fixture.bridge.read_card().await.unwrap();

    assert_eq!(read.uid, "04A1B2C3");
    assert!(read.timestamp >= before);
    assert_eq!(fixture.reader(0).probe_count(), 3);
    assert_eq!(fixture.cue.play_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_a_read_error() {
    let fixture = Fixture::new(fast_config());
    fixture.bridge.initialize().await.unwrap();

    let response = fixture.bridge.handle(&MethodCall::new("readCard")).await;

    assert_eq!(
        response,
        MethodResponse::error(ErrorCode::ReadError, "No card detected or reader busy")
    );
    assert_eq!(fixture.reader(0).probe_count(), 8);
    assert_eq!(fixture.cue.play_count(), 0);

    // The reader stays usable after a timeout.
    fixture.reader(0).present_card(vec![0x11, 0x22]);
    assert_eq!(fixture.bridge.read_card().await.unwrap().uid, "1122");
}

#[tokio::test]
async fn initialize_failure_is_init_error() {
    let fixture = Fixture::with_reader_setup(fast_config(), |control| {
        control.fail_init("RFID module not powered");
    });

    let response = fixture.bridge.handle(&MethodCall::new("initialize")).await;

    assert_eq!(response.error_code(), Some(ErrorCode::InitError));
    assert!(!fixture.bridge.is_initialized().await);

    // A failed init leaves the bridge uninitialized.
    let err = fixture.bridge.read_card().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotInitialized);
}

#[tokio::test]
async fn reader_factory_failure_is_init_error() {
    let bridge = ReaderBridge::<MockReader>::builder(fast_config())
        .reader_factory(|| Err(HardwareError::disconnected("C66")))
        .build()
        .unwrap();

    let err = bridge.initialize().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InitError);
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let fixture = Fixture::new(fast_config());

    assert!(fixture.bridge.dispose_reader().await);
    assert!(fixture.bridge.dispose_reader().await);

    fixture.bridge.initialize().await.unwrap();
    assert!(fixture.bridge.dispose_reader().await);
    assert!(fixture.bridge.dispose_reader().await);

    assert_eq!(fixture.reader(0).release_count(), 1);
    // Released on the first dispose, recreated by initialize, released again.
    assert_eq!(fixture.cue.release_count(), 2);

    let response = fixture.bridge.handle(&MethodCall::new("disposeReader")).await;
    assert_eq!(response, MethodResponse::success(true));
}

#[tokio::test]
async fn dispose_swallows_release_failures() {
    let fixture = Fixture::with_reader_setup(fast_config(), |control| {
        control.fail_release("free() threw");
    });
    fixture.bridge.initialize().await.unwrap();

    assert!(fixture.bridge.dispose_reader().await);
    assert!(fixture.reader(0).is_released());
    assert!(!fixture.bridge.is_initialized().await);
}

#[tokio::test]
async fn read_after_dispose_is_not_initialized() {
    let fixture = Fixture::new(fast_config());
    fixture.bridge.initialize().await.unwrap();
    fixture.bridge.dispose_reader().await;

    let err = fixture.bridge.read_card().await.unwrap_err();
    assert_eq!(err, BridgeError::NotInitialized);
}

#[tokio::test(start_paused = true)]
async fn dispose_during_read_settles_the_read() {
    let config = BridgeConfig {
        poll_timeout_ms: 8000,
        poll_interval_ms: 100,
        ..BridgeConfig::default()
    };
    let fixture = Fixture::new(config);
    fixture.bridge.initialize().await.unwrap();

    let bridge = fixture.bridge.clone();
    let read = tokio::spawn(async move { bridge.read_card().await });

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(fixture.bridge.dispose_reader().await);

    // The hardware is already free when dispose answers.
    let reader = fixture.reader(0);
    assert!(reader.is_released());
    assert_eq!(reader.release_count(), 1);

    let err = read.await.unwrap().unwrap_err();
    assert_eq!(err.code(), ErrorCode::ReadError);
    assert_eq!(reader.release_count(), 1);
    assert_eq!(reader.probe_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn initialize_right_after_dispose_during_read_keeps_the_new_reader() {
    let fixture = Fixture::new(fast_config());
    fixture.bridge.initialize().await.unwrap();

    let bridge = fixture.bridge.clone();
    let read = tokio::spawn(async move { bridge.read_card().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    fixture.bridge.dispose_reader().await;
    assert_eq!(fixture.reader(0).release_count(), 1);

    fixture.bridge.initialize().await.unwrap();
    assert!(read.await.unwrap().is_err());

    assert_eq!(fixture.reader_count(), 2);
    assert_eq!(fixture.reader(0).release_count(), 1);
    assert!(fixture.reader(1).is_initialized());
    assert_eq!(fixture.reader(1).release_count(), 0);

    fixture.reader(1).present_card(vec![0x5A]);
    assert_eq!(fixture.bridge.read_card().await.unwrap().uid, "5A");
}

/// Driver that panics mid-probe; counts releases.
struct PanickingReader {
    releases: Arc<AtomicUsize>,
}

impl CardReader for PanickingReader {
    async fn initialize(&mut self) -> mifare_hardware::Result<()> {
        Ok(())
    }

    async fn probe_for_card(&mut self) -> mifare_hardware::Result<Option<Vec<u8>>> {
        panic!("driver fault during anticollision")
    }

    async fn reader_info(&self) -> mifare_hardware::Result<ReaderInfo> {
        Ok(ReaderInfo::new("Panicking Reader", vec!["ISO14443A".to_string()]))
    }

    async fn release(&mut self) -> mifare_hardware::Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn panicking_poll_still_releases_the_reader() {
    let releases = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&releases);
    let bridge = ReaderBridge::builder(fast_config())
        .reader_factory(move || {
            Ok(PanickingReader {
                releases: Arc::clone(&counter),
            })
        })
        .build()
        .unwrap();
    bridge.initialize().await.unwrap();

    let err = bridge.read_card().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::ReadError);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
    assert!(!bridge.is_initialized().await);
    assert_eq!(
        bridge.read_card().await.unwrap_err(),
        BridgeError::NotInitialized
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_read_is_rejected_as_busy() {
    let fixture = Fixture::new(fast_config());
    fixture.bridge.initialize().await.unwrap();

    let bridge = fixture.bridge.clone();
    let first = tokio::spawn(async move { bridge.read_card().await });
    tokio::time::sleep(Duration::from_millis(150)).await;

    let second = fixture.bridge.read_card().await.unwrap_err();
    assert_eq!(second.code(), ErrorCode::ReadError);
    assert!(second.to_string().contains("busy"));

    fixture.reader(0).present_card(vec![0xAB]);
    assert_eq!(first.await.unwrap().unwrap().uid, "AB");
}

#[tokio::test]
async fn initialize_after_dispose_creates_a_new_reader() {
    let fixture = Fixture::new(fast_config());

    fixture.bridge.initialize().await.unwrap();
    fixture.bridge.dispose_reader().await;
    fixture.bridge.initialize().await.unwrap();

    assert_eq!(fixture.reader_count(), 2);
    assert!(fixture.reader(0).is_released());
    assert!(fixture.reader(1).is_initialized());
}

#[tokio::test(start_paused = true)]
async fn successful_reads_are_broadcast() {
    let fixture = Fixture::with_reader_setup(fast_config(), |control| {
        control.queue_card(vec![0x01, 0x02]);
        control.queue_card(vec![0x03, 0x04]);
    });
    let mut tags = fixture.bridge.subscribe_tags();
    fixture.bridge.initialize().await.unwrap();

    fixture.bridge.read_card().await.unwrap();
    fixture.bridge.read_card().await.unwrap();

    assert_eq!(tags.recv().await.unwrap().uid.to_hex(), "0102");
    assert_eq!(tags.recv().await.unwrap().uid.to_hex(), "0304");
}

#[tokio::test]
async fn unknown_method_is_not_implemented() {
    let fixture = Fixture::new(fast_config());

    let response = fixture
        .bridge
        .handle(&MethodCall::new("enableNfcForeground"))
        .await;

    assert_eq!(response, MethodResponse::NotImplemented);
}

#[tokio::test]
async fn initialize_is_idempotent_over_the_channel() {
    let fixture = Fixture::new(fast_config());

    for _ in 0..3 {
        let response = fixture.bridge.handle(&MethodCall::new("initialize")).await;
        assert_eq!(response, MethodResponse::success(true));
    }
    assert_eq!(fixture.reader_count(), 1);
}
