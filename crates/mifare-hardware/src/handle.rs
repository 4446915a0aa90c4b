//! Owned handle around an initialized reader.
//!
//! A [`ReaderHandle`] only exists for a reader whose `initialize` succeeded.
//! It carries a disposal token: once the token is cancelled, from the handle
//! itself or from a [`DisposeSignal`] held elsewhere, every probe fails fast
//! with [`HardwareError::Disposed`].

use mifare_core::CardUid;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HardwareError, Result};
use crate::traits::CardReader;

/// Exclusive owner of an initialized reader.
#[derive(Debug)]
pub struct ReaderHandle<R> {
    reader: R,
    disposed: CancellationToken,
}

impl<R: CardReader> ReaderHandle<R> {
    /// Initialize `reader` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns the driver's initialization error; the reader is dropped.
    pub async fn open(mut reader: R) -> Result<Self> {
        reader.initialize().await?;

        match reader.reader_info().await {
            Ok(info) => info!(
                reader = %info.name,
                protocols = ?info.protocols,
                firmware = info.firmware_version.as_deref().unwrap_or("-"),
                "Reader initialized"
            ),
            Err(e) => warn!("Reader initialized but info unavailable: {}", e),
        }

        Ok(Self {
            reader,
            disposed: CancellationToken::new(),
        })
    }

    /// Run one probe and turn the raw bytes into a UID.
    ///
    /// Empty reads come back as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Disposed` without touching the hardware once
    /// the handle has been disposed, otherwise the driver's error.
    pub async fn probe(&mut self) -> Result<Option<CardUid>> {
        if self.disposed.is_cancelled() {
            return Err(HardwareError::Disposed);
        }
        let raw = self.reader.probe_for_card().await?;
        Ok(CardUid::from_probe(raw))
    }

    /// Release the hardware. Disposes the handle first.
    ///
    /// # Errors
    ///
    /// Returns the driver's release error.
    pub async fn release(mut self) -> Result<()> {
        self.disposed.cancel();
        debug!("Releasing reader");
        self.reader.release().await
    }
}

impl<R> ReaderHandle<R> {
    /// Signal that can dispose this handle from another task.
    pub fn dispose_signal(&self) -> DisposeSignal {
        DisposeSignal(self.disposed.clone())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_cancelled()
    }
}

/// Cloneable trigger that invalidates a [`ReaderHandle`].
#[derive(Debug, Clone)]
pub struct DisposeSignal(CancellationToken);

impl DisposeSignal {
    /// Invalidate the handle. Idempotent.
    pub fn dispose(&self) {
        self.0.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once the handle is disposed.
    pub async fn disposed(&self) {
        self.0.cancelled().await;
    }
}
