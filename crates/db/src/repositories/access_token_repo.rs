//! Repository for the `access_tokens` table.

use sigil_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::access_token::{AccessToken, CreateAccessToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, token_uuid, auth_code_id, client_id, user_id, scope, \
                       issued_at, expires_at, revoked, revoked_at";

/// Provides issuance, lookup, and revocation of access tokens.
pub struct AccessTokenRepo;

impl AccessTokenRepo {
    /// Insert a new token row inside the caller's transaction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateAccessToken,
    ) -> Result<AccessToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO access_tokens \
             (token_uuid, auth_code_id, client_id, user_id, scope, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(input.token_uuid)
            .bind(input.auth_code_id)
            .bind(&input.client_id)
            .bind(input.user_id)
            .bind(&input.scope)
            .bind(input.expires_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a token row by its embedded uuid.
    pub async fn find_by_uuid(
        pool: &PgPool,
        token_uuid: Uuid,
    ) -> Result<Option<AccessToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM access_tokens WHERE token_uuid = $1");
        sqlx::query_as::<_, AccessToken>(&query)
            .bind(token_uuid)
            .fetch_optional(pool)
            .await
    }

    /// Revoke a single token. Idempotent: returns `true` only when the row
    /// actually flipped, so repeated revocations do not produce duplicate
    /// ledger entries.
    pub async fn revoke(
        tx: &mut Transaction<'_, Postgres>,
        token_uuid: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE access_tokens SET revoked = TRUE, revoked_at = NOW() \
             WHERE token_uuid = $1 AND revoked = FALSE",
        )
        .bind(token_uuid)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every token issued from a given authorization code. Used as
    /// defense-in-depth when a code replay is detected. Returns the
    /// affected token uuids.
    pub async fn revoke_all_for_code(
        tx: &mut Transaction<'_, Postgres>,
        auth_code_id: DbId,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "UPDATE access_tokens SET revoked = TRUE, revoked_at = NOW() \
             WHERE auth_code_id = $1 AND revoked = FALSE \
             RETURNING token_uuid",
        )
        .bind(auth_code_id)
        .fetch_all(&mut **tx)
        .await
    }
}
