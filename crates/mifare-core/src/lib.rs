//! Shared types for the MIFARE reader bridge.
//!
//! This crate holds the pieces every other crate in the workspace agrees on:
//! the [`CardUid`] value type and its hex transport form, the error codes
//! surfaced across the method channel, and the [`BridgeConfig`] loaded at
//! startup.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use types::*;
