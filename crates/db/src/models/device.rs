//! Device and device-link entity models.

use serde::Serialize;
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A fingerprinted device. Never deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub device_hash: String,
    pub first_seen_at: Timestamp,
    pub last_seen_at: Timestamp,
}

/// A device-to-user association observed at redeem/auth time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceLink {
    pub device_hash: String,
    pub user_id: DbId,
    pub first_seen_at: Timestamp,
    pub last_seen_at: Timestamp,
}
