//! Authorization code entity model and DTOs.

use serde::{Deserialize, Serialize};
use sigil_core::types::{DbId, Timestamp};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted single-use authorization code.
///
/// State machine: issued -> redeemed (terminal) or issued -> expired
/// (terminal). The `consumed` flip is a single conditional UPDATE.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuthCode {
    pub id: DbId,
    pub code_uuid: Uuid,
    pub client_id: String,
    pub user_id: DbId,
    pub redirect_uri: String,
    pub scope: String,
    pub expires_at: Timestamp,
    pub consumed: bool,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a new authorization code.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthCode {
    pub code_uuid: Uuid,
    pub client_id: String,
    pub user_id: DbId,
    pub redirect_uri: String,
    pub scope: String,
    pub expires_at: Timestamp,
}
