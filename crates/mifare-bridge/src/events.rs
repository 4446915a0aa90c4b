//! Tag events pushed to listeners after every successful read.

use chrono::{DateTime, Utc};
use mifare_core::CardUid;
use serde::{Deserialize, Serialize};

/// A card that was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    /// UID, serialized as uppercase hex.
    pub uid: CardUid,

    /// Detection time.
    pub timestamp: DateTime<Utc>,
}

impl TagEvent {
    pub fn new(uid: CardUid, timestamp: DateTime<Utc>) -> Self {
        Self { uid, timestamp }
    }
}
