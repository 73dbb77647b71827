//! Repository for the `auth_codes` table.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::auth_code::{AuthCode, CreateAuthCode};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, code_uuid, client_id, user_id, redirect_uri, scope, \
                       expires_at, consumed, consumed_at, created_at";

/// Provides issuance and single-use consumption of authorization codes.
pub struct AuthCodeRepo;

impl AuthCodeRepo {
    /// Insert a new code row inside the caller's transaction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateAuthCode,
    ) -> Result<AuthCode, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_codes \
             (code_uuid, client_id, user_id, redirect_uri, scope, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuthCode>(&query)
            .bind(input.code_uuid)
            .bind(&input.client_id)
            .bind(input.user_id)
            .bind(&input.redirect_uri)
            .bind(&input.scope)
            .bind(input.expires_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a code row by its embedded uuid.
    pub async fn find_by_uuid(
        pool: &PgPool,
        code_uuid: Uuid,
    ) -> Result<Option<AuthCode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM auth_codes WHERE code_uuid = $1");
        sqlx::query_as::<_, AuthCode>(&query)
            .bind(code_uuid)
            .fetch_optional(pool)
            .await
    }

    /// Atomically flip `consumed = false -> true`.
    ///
    /// The first exchange sees the row returned; any concurrent or later
    /// attempt gets `None`, which the caller treats as a replay.
    pub async fn consume(
        tx: &mut Transaction<'_, Postgres>,
        code_uuid: Uuid,
    ) -> Result<Option<AuthCode>, sqlx::Error> {
        let query = format!(
            "UPDATE auth_codes SET consumed = TRUE, consumed_at = NOW() \
             WHERE code_uuid = $1 AND consumed = FALSE \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuthCode>(&query)
            .bind(code_uuid)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Delete expired rows for storage hygiene (never required for
    /// correctness).
    pub async fn reap_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_codes WHERE expires_at < NOW() AND consumed = FALSE")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
