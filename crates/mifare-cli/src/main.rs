//! MIFARE reader bridge host.
//!
//! Serves the reader method channel as line-delimited JSON on stdin and
//! stdout. Logs go to stderr.
//!
//! ```text
//! mifare-cli [config.json]
//! ```
//!
//! The reader is the mock ISO 14443A driver. Set `MIFARE_MOCK_CARD` to a hex
//! UID to place that card in its field.

mod host;

use std::sync::Arc;

use anyhow::Context;
use mifare_bridge::ReaderBridge;
use mifare_core::{BridgeConfig, CardUid};
use mifare_hardware::mock::{MockCue, MockReader};
use mifare_hardware::{AnyCardReader, ConfirmationCue};
use tracing::info;

const MOCK_CARD_VAR: &str = "MIFARE_MOCK_CARD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mifare_cli=info,mifare_bridge=info,mifare_hardware=info".into()
            }),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => BridgeConfig::load(&path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => BridgeConfig::default(),
    };

    let card = match std::env::var(MOCK_CARD_VAR) {
        Ok(hex) => Some(
            CardUid::from_hex(&hex).with_context(|| format!("invalid {MOCK_CARD_VAR}: {hex}"))?,
        ),
        Err(_) => None,
    };
    if let Some(uid) = &card {
        info!(uid = %uid, "Mock card in field");
    }

    let bridge = ReaderBridge::<AnyCardReader>::builder(config)
        .reader_factory(move || {
            let (reader, control) = MockReader::new();
            if let Some(uid) = &card {
                control.present_card(uid.as_bytes().to_vec());
            }
            Ok(AnyCardReader::from(reader))
        })
        .cue_factory(|tone| Ok(Arc::new(MockCue::with_tone(tone)) as Arc<dyn ConfirmationCue>))
        .build()?;

    host::serve(bridge, tokio::io::stdin(), tokio::io::stdout()).await
}
