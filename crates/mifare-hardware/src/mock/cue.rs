//! Mock confirmation cue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{HardwareError, Result};
use crate::traits::ConfirmationCue;
use crate::types::ToneSpec;

/// Counts plays instead of making a sound.
///
/// Clones share their counters, so a test can keep one clone and hand the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockCue {
    plays: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    tone: ToneSpec,
}

impl MockCue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cue configured with `tone`.
    pub fn with_tone(tone: ToneSpec) -> Self {
        Self {
            tone,
            ..Self::default()
        }
    }

    pub fn tone(&self) -> ToneSpec {
        self.tone
    }

    /// A cue whose `play` always errors.
    pub fn failing() -> Self {
        let cue = Self::default();
        cue.failing.store(true, Ordering::SeqCst);
        cue
    }

    /// Number of successful plays.
    pub fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ConfirmationCue for MockCue {
    fn play(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::audio("mock tone generator failure"));
        }
        if self.releases.load(Ordering::SeqCst) > 0 {
            return Err(HardwareError::audio("tone generator released"));
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
