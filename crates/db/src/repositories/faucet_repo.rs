//! Repository for the `faucet_tokens` table.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::faucet::{CreateFaucetToken, FaucetToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token_uuid, token_type, payload_json, single_use, \
                       max_scans, scan_count, expires_at, consumed_at, created_at";

/// Provides issue and redemption operations for faucet tokens.
pub struct FaucetRepo;

impl FaucetRepo {
    /// Insert a new token row inside the caller's transaction, so the row
    /// and its `token_issued` ledger entry commit together.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateFaucetToken,
    ) -> Result<FaucetToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO faucet_tokens \
             (token_uuid, token_type, payload_json, single_use, max_scans, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FaucetToken>(&query)
            .bind(input.token_uuid)
            .bind(&input.token_type)
            .bind(&input.payload_json)
            .bind(input.single_use)
            .bind(input.max_scans)
            .bind(input.expires_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Atomically claim one scan of a token.
    ///
    /// A single conditional UPDATE guarded by `scan_count < max_scans`
    /// closes the race between two concurrent scans: exactly one of them
    /// sees the row returned, the other gets `None`. The caller
    /// distinguishes "consumed" from "never existed" via [`Self::find_by_uuid`].
    pub async fn claim_scan(
        tx: &mut Transaction<'_, Postgres>,
        token_uuid: Uuid,
    ) -> Result<Option<FaucetToken>, sqlx::Error> {
        let query = format!(
            "UPDATE faucet_tokens \
             SET scan_count = scan_count + 1, \
                 consumed_at = CASE WHEN scan_count + 1 >= max_scans THEN NOW() ELSE consumed_at END \
             WHERE token_uuid = $1 AND scan_count < max_scans \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FaucetToken>(&query)
            .bind(token_uuid)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Find a token row by its embedded uuid.
    pub async fn find_by_uuid(
        pool: &PgPool,
        token_uuid: Uuid,
    ) -> Result<Option<FaucetToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM faucet_tokens WHERE token_uuid = $1");
        sqlx::query_as::<_, FaucetToken>(&query)
            .bind(token_uuid)
            .fetch_optional(pool)
            .await
    }

    /// Delete expired rows for storage hygiene. Correctness never depends
    /// on this running -- expiry is enforced at verify time by data.
    pub async fn reap_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM faucet_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
