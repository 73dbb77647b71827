//! Hash-chain math for the append-only event ledger.
//!
//! Each entry commits to the previous entry's hash plus its own payload
//! hash and sequence number, so anyone holding a contiguous range of
//! entries can verify integrity without trusting the server. Persistence
//! and append serialization live in `sigil-db`; this module is the pure
//! part every subsystem shares -- any feature needing tamper-evidence
//! appends to a ledger instead of hand-rolling its own hash scheme.

use serde::Serialize;

use crate::hashing::sha256_hex;
use crate::types::DbId;

/// `prev_hash` of the first entry in every chain.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Name of the default logical ledger.
pub const DEFAULT_LEDGER: &str = "authority";

/// Known event types for ledger entries.
pub mod event_types {
    pub const TOKEN_ISSUED: &str = "token_issued";
    pub const TOKEN_REDEEMED: &str = "token_redeemed";
    pub const AUTH_CODE_ISSUED: &str = "auth_code_issued";
    pub const TOKEN_EXCHANGED: &str = "token_exchanged";
    pub const ACCESS_TOKEN_REVOKED: &str = "access_token_revoked";
    pub const DEVICE_LINKED: &str = "device_linked";
    pub const CLIENT_REGISTERED: &str = "client_registered";
    pub const CLIENT_SECRET_ROTATED: &str = "client_secret_rotated";
}

/// Errors produced by ledger operations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A concurrent append won the sequence slot. Expected under
    /// contention; retried a bounded number of times by the repository.
    #[error("concurrent ledger append conflict")]
    WriteConflict,

    /// The chain does not verify. Fatal: trust decisions over the affected
    /// range must halt until investigated.
    #[error("ledger chain broken at sequence {sequence}")]
    ChainBroken { sequence: i64 },
}

/// The hash fields of a single entry, as needed for verification.
///
/// `sigil-db` rows convert into this; tests construct it directly.
#[derive(Debug, Clone, Serialize)]
pub struct ChainEntry {
    pub sequence: i64,
    pub payload_hash: String,
    pub prev_hash: String,
    pub entry_hash: String,
}

/// Compute the SHA-256 hash of an event's canonical JSON payload.
///
/// serde_json's default map is BTreeMap-backed, so object keys serialize
/// sorted and the bytes are deterministic.
pub fn payload_hash(payload: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(payload).expect("payload serialization cannot fail");
    sha256_hex(&bytes)
}

/// Compute an entry's commitment hash from its chain position.
///
/// The concatenation format must not change after any entries have been
/// persisted.
pub fn entry_hash(prev_hash: &str, payload_hash: &str, sequence: i64) -> String {
    sha256_hex(format!("{prev_hash}|{payload_hash}|{sequence}").as_bytes())
}

/// Result of verifying a range of entries.
#[derive(Debug, Clone, Serialize)]
pub struct ChainVerification {
    /// Number of entries checked.
    pub verified_entries: i64,
    /// Whether the entire range is valid.
    pub chain_valid: bool,
    /// Sequence of the first entry where the chain breaks, if any.
    pub first_break: Option<DbId>,
}

/// Verify a contiguous, sequence-ordered range of entries.
///
/// Recomputes every `entry_hash` and checks continuity of `prev_hash`
/// against the preceding entry (entry 0 must chain from
/// [`GENESIS_PREV_HASH`]). If the range does not start at sequence 0, the
/// first entry's stored `prev_hash` is taken on trust and continuity is
/// checked from there.
pub fn verify_entries(entries: &[ChainEntry]) -> ChainVerification {
    let mut expected_prev: Option<&str> = None;
    let mut expected_sequence: Option<i64> = None;

    for entry in entries {
        let broken = ChainVerification {
            verified_entries: entries.len() as i64,
            chain_valid: false,
            first_break: Some(entry.sequence),
        };

        // Gaps in the range break the chain.
        if let Some(expected) = expected_sequence {
            if entry.sequence != expected {
                return broken;
            }
        }

        // Continuity: prev_hash must equal the previous entry_hash (or the
        // genesis constant for sequence 0).
        if entry.sequence == 0 && entry.prev_hash != GENESIS_PREV_HASH {
            return broken;
        }
        if let Some(prev) = expected_prev {
            if entry.prev_hash != prev {
                return broken;
            }
        }

        // The stored commitment must recompute.
        if entry_hash(&entry.prev_hash, &entry.payload_hash, entry.sequence) != entry.entry_hash {
            return broken;
        }

        expected_prev = Some(&entry.entry_hash);
        expected_sequence = Some(entry.sequence + 1);
    }

    ChainVerification {
        verified_entries: entries.len() as i64,
        chain_valid: true,
        first_break: None,
    }
}
