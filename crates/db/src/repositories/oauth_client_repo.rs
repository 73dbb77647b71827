//! Repository for the `oauth_clients` table.

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::oauth_client::{CreateOAuthClient, OAuthClient};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, client_secret_hash, client_name, \
                       redirect_uris, secret_rotated_at, created_at";

/// Provides registration and lookup for relying-party clients.
pub struct OAuthClientRepo;

impl OAuthClientRepo {
    /// Insert a new client inside the caller's transaction, so the row and
    /// its `client_registered` ledger entry commit together.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        input: &CreateOAuthClient,
    ) -> Result<OAuthClient, sqlx::Error> {
        let query = format!(
            "INSERT INTO oauth_clients (client_id, client_secret_hash, client_name, redirect_uris) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OAuthClient>(&query)
            .bind(&input.client_id)
            .bind(&input.client_secret_hash)
            .bind(&input.client_name)
            .bind(&input.redirect_uris)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a client by its public identifier.
    pub async fn find_by_client_id(
        pool: &PgPool,
        client_id: &str,
    ) -> Result<Option<OAuthClient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM oauth_clients WHERE client_id = $1");
        sqlx::query_as::<_, OAuthClient>(&query)
            .bind(client_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the stored secret hash inside the caller's transaction. The
    /// old hash is invalidated in the same statement; there is no
    /// dual-secret window for client secrets.
    pub async fn rotate_secret(
        tx: &mut Transaction<'_, Postgres>,
        client_id: &str,
        new_secret_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE oauth_clients \
             SET client_secret_hash = $2, secret_rotated_at = NOW() \
             WHERE client_id = $1",
        )
        .bind(client_id)
        .bind(new_secret_hash)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
