//! Repository for the `ledger_entries` table.
//!
//! Appends are serialized per logical ledger with a transaction-scoped
//! advisory lock over the ledger name -- the smallest critical section that
//! still guarantees a gapless, strictly ordered sequence. Appends to
//! different logical ledgers proceed in parallel. The `(ledger, sequence)`
//! unique constraint is the backstop: if two appends ever race past the
//! lock, one fails with a conflict and is retried.

use sqlx::{PgPool, Postgres, Transaction};

use sigil_core::ledger::{
    self, ChainVerification, GENESIS_PREV_HASH,
};

use crate::models::ledger::LedgerEntry;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, ledger, sequence, event_type, subject, payload_json, \
                       payload_hash, prev_hash, entry_hash, created_at";

/// Maximum attempts for a standalone append before giving up.
const MAX_APPEND_ATTEMPTS: u32 = 3;

/// Backoff step between append retries, in milliseconds.
const APPEND_RETRY_BACKOFF_MS: u64 = 25;

/// Provides append and verification operations for ledger entries.
pub struct LedgerRepo;

impl LedgerRepo {
    /// Append an entry inside a caller-owned transaction.
    ///
    /// The caller's triggering operation (token redemption, code exchange)
    /// and the ledger entry commit or roll back together, so a failed
    /// append can never leave a silently skipped sequence number.
    pub async fn append_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        ledger_name: &str,
        event_type: &str,
        subject: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<LedgerEntry, sqlx::Error> {
        // Serialize appends for this ledger until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(ledger_name)
            .execute(&mut **tx)
            .await?;

        let tail: Option<(i64, String)> = sqlx::query_as(
            "SELECT sequence, entry_hash FROM ledger_entries \
             WHERE ledger = $1 ORDER BY sequence DESC LIMIT 1",
        )
        .bind(ledger_name)
        .fetch_optional(&mut **tx)
        .await?;

        let (sequence, prev_hash) = match tail {
            Some((tail_sequence, tail_hash)) => (tail_sequence + 1, tail_hash),
            None => (0, GENESIS_PREV_HASH.to_string()),
        };

        let payload_hash = ledger::payload_hash(payload);
        let entry_hash = ledger::entry_hash(&prev_hash, &payload_hash, sequence);

        let query = format!(
            "INSERT INTO ledger_entries \
             (ledger, sequence, event_type, subject, payload_json, payload_hash, prev_hash, entry_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(ledger_name)
            .bind(sequence)
            .bind(event_type)
            .bind(subject)
            .bind(payload)
            .bind(&payload_hash)
            .bind(&prev_hash)
            .bind(&entry_hash)
            .fetch_one(&mut **tx)
            .await
    }

    /// Append an entry in its own transaction.
    ///
    /// Write conflicts (unique violation on the sequence slot, or a
    /// serialization failure) are expected under contention and retried a
    /// bounded number of times with backoff. Validation and crypto failures
    /// never reach this path and are never retried.
    pub async fn append(
        pool: &PgPool,
        ledger_name: &str,
        event_type: &str,
        subject: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<LedgerEntry, sqlx::Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut tx = pool.begin().await?;
            let result =
                Self::append_in_tx(&mut tx, ledger_name, event_type, subject, payload).await;

            match result {
                Ok(entry) => {
                    tx.commit().await?;
                    return Ok(entry);
                }
                Err(err) if is_write_conflict(&err) && attempt < MAX_APPEND_ATTEMPTS => {
                    drop(tx);
                    tracing::warn!(
                        ledger = ledger_name,
                        event_type,
                        attempt,
                        "Ledger append conflict, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(
                        APPEND_RETRY_BACKOFF_MS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch a contiguous sequence range, ordered ascending.
    pub async fn fetch_range(
        pool: &PgPool,
        ledger_name: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries \
             WHERE ledger = $1 AND sequence >= $2 AND sequence <= $3 \
             ORDER BY sequence ASC"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(ledger_name)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }

    /// Verify chain integrity over `[from, to]`.
    ///
    /// Recomputes every entry hash and checks continuity; the first broken
    /// sequence is identified in the result. A break is logged at error
    /// level -- it signals tampering or a storage bug, and trust decisions
    /// over the range must halt until investigated.
    pub async fn verify_chain(
        pool: &PgPool,
        ledger_name: &str,
        from: i64,
        to: i64,
    ) -> Result<ChainVerification, sqlx::Error> {
        let entries = Self::fetch_range(pool, ledger_name, from, to).await?;
        let chain: Vec<_> = entries.iter().map(LedgerEntry::chain_entry).collect();

        let result = ledger::verify_entries(&chain);
        if !result.chain_valid {
            tracing::error!(
                ledger = ledger_name,
                first_break = ?result.first_break,
                "Ledger chain verification FAILED"
            );
        }
        Ok(result)
    }

    /// Read-only projection of all entries for a subject, ordered by
    /// ledger and sequence.
    pub async fn entries_for_subject(
        pool: &PgPool,
        subject: &str,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ledger_entries \
             WHERE subject = $1 \
             ORDER BY ledger ASC, sequence ASC"
        );
        sqlx::query_as::<_, LedgerEntry>(&query)
            .bind(subject)
            .fetch_all(pool)
            .await
    }

    /// Current tail sequence of a ledger, if any entries exist.
    pub async fn tail_sequence(
        pool: &PgPool,
        ledger_name: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT sequence FROM ledger_entries WHERE ledger = $1 ORDER BY sequence DESC LIMIT 1",
        )
        .bind(ledger_name)
        .fetch_optional(pool)
        .await
    }
}

/// Whether a sqlx error is a retryable write conflict: a PostgreSQL unique
/// violation (23505) on the sequence slot or a serialization failure (40001).
fn is_write_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("23505") | Some("40001"))
        }
        _ => false,
    }
}
