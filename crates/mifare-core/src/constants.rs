//! Constants shared by the reader bridge crates.
//!
//! Polling defaults mirror the timing the handheld reader was tuned for: the
//! operator gets eight seconds to tap a card and the reader is probed ten
//! times per second.

/// Method channel the host shell talks to.
pub const DEFAULT_CHANNEL: &str = "com.example.operator_mobile_app/mifare_reader";

/// Maximum time to wait for a card tap, in milliseconds.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 8000;

/// Delay between two detection probes, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Length of the confirmation beep, in milliseconds.
pub const DEFAULT_BEEP_DURATION_MS: u64 = 100;

/// Confirmation beep volume (0-100).
pub const DEFAULT_BEEP_VOLUME: u8 = 100;

/// Upper bound for [`DEFAULT_BEEP_VOLUME`] and configured volumes.
pub const MAX_BEEP_VOLUME: u8 = 100;

/// Buffered tag events kept for slow subscribers.
pub const DEFAULT_TAG_EVENT_CAPACITY: usize = 16;

/// A progress line is logged on the first probe and then every this many probes.
pub const POLL_LOG_EVERY: u32 = 50;

/// Method names accepted on the channel.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const READ_CARD: &str = "readCard";
    pub const DISPOSE_READER: &str = "disposeReader";
}

/// Messages returned with channel errors.
pub mod messages {
    pub const NOT_INITIALIZED: &str = "MIFARE reader not initialized";
    pub const NO_CARD: &str = "No card detected or reader busy";
    pub const READER_BUSY: &str = "Reader busy: another read is in progress";
    pub const INIT_FAILED: &str = "Failed to initialize MIFARE reader";
}
