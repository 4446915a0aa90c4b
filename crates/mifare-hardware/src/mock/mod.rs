//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod cue;
pub mod reader;

// Re-export commonly used types
pub use cue::MockCue;
pub use reader::{MockReader, MockReaderControl};
