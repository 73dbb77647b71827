//! Ledger entry entity model.
//!
//! Entries are immutable once created -- there is no update DTO and no
//! `updated_at` column, by construction.

use serde::Serialize;
use sigil_core::ledger::ChainEntry;
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A single hash-chained ledger entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: DbId,
    /// Logical ledger name. Appends to different ledgers are independent.
    pub ledger: String,
    /// Monotonically increasing, unique per ledger.
    pub sequence: i64,
    pub event_type: String,
    /// Optional projection key (token id, user id, client id).
    pub subject: Option<String>,
    pub payload_json: serde_json::Value,
    /// SHA-256 of the canonical JSON payload.
    pub payload_hash: String,
    /// `entry_hash` of the previous entry (genesis constant for sequence 0).
    pub prev_hash: String,
    /// SHA-256 commitment over `(prev_hash, payload_hash, sequence)`.
    pub entry_hash: String,
    pub created_at: Timestamp,
}

impl LedgerEntry {
    /// Project the hash fields for chain verification.
    ///
    /// The payload hash is recomputed from the stored payload rather than
    /// read from its column, so edits to `payload_json` after the fact
    /// surface as a chain break.
    pub fn chain_entry(&self) -> ChainEntry {
        ChainEntry {
            sequence: self.sequence,
            payload_hash: sigil_core::ledger::payload_hash(&self.payload_json),
            prev_hash: self.prev_hash.clone(),
            entry_hash: self.entry_hash.clone(),
        }
    }
}
