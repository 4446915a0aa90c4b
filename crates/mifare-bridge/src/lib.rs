//! Method-channel bridge for the MIFARE reader.
//!
//! The host application shell talks to the reader through three calls,
//! `initialize`, `readCard` and `disposeReader`. [`ReaderBridge`] owns the
//! reader lifecycle behind those calls; [`MethodCall`] and
//! [`MethodResponse`] are their transport-neutral JSON form.
//!
//! # Architecture
//!
//! ```text
//! host shell ──► MethodCall ──► ReaderBridge ──► CardPollingSession (worker task)
//!            ◄── MethodResponse ◄──┘      └──► TagEvent broadcast
//! ```
//!
//! # Example
//!
//! ```
//! use mifare_bridge::{MethodCall, MethodResponse, ReaderBridge};
//! use mifare_core::BridgeConfig;
//! use mifare_hardware::mock::MockReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mifare_bridge::BridgeError> {
//!     let (reader, control) = MockReader::new();
//!     control.present_card(vec![0x04, 0xA1, 0xB2, 0xC3]);
//!
//!     let mut reader = Some(reader);
//!     let bridge = ReaderBridge::builder(BridgeConfig::default())
//!         .reader_factory(move || {
//!             reader
//!                 .take()
//!                 .ok_or_else(|| mifare_hardware::HardwareError::other("reader already taken"))
//!         })
//!         .build()?;
//!
//!     bridge.handle(&MethodCall::new("initialize")).await;
//!     match bridge.handle(&MethodCall::new("readCard")).await {
//!         MethodResponse::Success { value } => assert_eq!(value["uid"], "04A1B2C3"),
//!         other => panic!("read failed: {other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod channel;
pub mod error;
pub mod events;

pub use bridge::{CardRead, ReaderBridge, ReaderBridgeBuilder};
pub use channel::{MethodCall, MethodResponse};
pub use error::{BridgeError, Result};
pub use events::TagEvent;
