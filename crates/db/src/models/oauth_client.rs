//! OAuth client entity model and DTOs.

use serde::{Deserialize, Serialize};
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A registered relying-party client.
///
/// Immutable except for secret rotation. The plaintext secret is never
/// stored -- only its argon2 hash.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OAuthClient {
    pub id: DbId,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret_hash: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
    pub secret_rotated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOAuthClient {
    pub client_id: String,
    pub client_secret_hash: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
}
