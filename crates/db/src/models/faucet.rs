//! Faucet token entity model and DTOs.

use serde::{Deserialize, Serialize};
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted faucet token row.
///
/// The encoded token string itself is never stored; the row carries the
/// redemption state keyed by the `token_uuid` embedded in the signed
/// payload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FaucetToken {
    pub id: DbId,
    pub token_uuid: Uuid,
    pub token_type: String,
    pub payload_json: serde_json::Value,
    pub single_use: bool,
    pub max_scans: i32,
    pub scan_count: i32,
    pub expires_at: Timestamp,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl FaucetToken {
    /// Scans still available after the current state.
    pub fn scans_remaining(&self) -> i32 {
        self.max_scans - self.scan_count
    }
}

/// DTO for inserting a new faucet token.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFaucetToken {
    pub token_uuid: Uuid,
    pub token_type: String,
    pub payload_json: serde_json::Value,
    pub single_use: bool,
    pub max_scans: i32,
    pub expires_at: Timestamp,
}
