//! Access token entity model and DTOs.

use serde::{Deserialize, Serialize};
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted access token.
///
/// Validity: signature valid (checked by the codec) AND not expired AND
/// not revoked.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccessToken {
    pub id: DbId,
    pub token_uuid: Uuid,
    /// The code this token was exchanged from; revoked wholesale if that
    /// code is ever replayed.
    pub auth_code_id: Option<DbId>,
    pub client_id: String,
    pub user_id: DbId,
    pub scope: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub revoked: bool,
    pub revoked_at: Option<Timestamp>,
}

/// DTO for inserting a new access token.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccessToken {
    pub token_uuid: Uuid,
    pub auth_code_id: Option<DbId>,
    pub client_id: String,
    pub user_id: DbId,
    pub scope: String,
    pub expires_at: Timestamp,
}
