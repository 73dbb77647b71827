//! Handlers for the `/faucet` resource (issue, redeem).
//!
//! A faucet token is a signed envelope whose payload carries
//! `{kind, token_id, data}`. The encoded string is what ends up in a QR
//! code; the database row keyed by `token_id` carries the redemption state.
//! Redeeming an `auth`-kind token additionally mints a user session (the
//! QR login flow).

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use sigil_core::codec::CodecError;
use sigil_core::device::{self, DeviceAttributes, SUSPICIOUS_WINDOW_HOURS};
use sigil_core::error::{CoreError, FaucetError};
use sigil_core::ledger::{event_types, DEFAULT_LEDGER};
use sigil_core::types::{DbId, Timestamp};
use sigil_db::models::faucet::CreateFaucetToken;
use sigil_db::repositories::{DeviceRepo, FaucetRepo, LedgerRepo, UserRepo};

use crate::auth::session::generate_session_token;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Token kind whose redemption mints a user session.
const AUTH_TOKEN_KIND: &str = "auth";

/// Upper bound on `max_scans` accepted at issue time.
const MAX_SCANS_LIMIT: i32 = 1000;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /faucet/issue`.
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    /// Token kind, e.g. `"auth"`, `"voucher"`, `"invite"`.
    pub token_type: String,
    /// Arbitrary JSON object carried inside the signed envelope.
    pub payload: serde_json::Value,
    /// Token lifetime; defaults to `DEFAULT_TOKEN_TTL_SECS`.
    pub ttl_secs: Option<i64>,
    /// Redemption budget; defaults to 1.
    pub max_scans: Option<i32>,
    /// Convenience flag: `true` forces `max_scans = 1`.
    pub single_use: Option<bool>,
}

/// Response body for `POST /faucet/issue`.
#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    /// The encoded signed token (this is what goes into the QR code).
    pub token: String,
    pub token_id: Uuid,
    pub token_type: String,
    pub max_scans: i32,
    pub expires_at: Timestamp,
}

/// Response body for `POST /faucet/redeem/{token}`.
#[derive(Debug, Serialize)]
pub struct RedeemTokenResponse {
    pub token_id: Uuid,
    pub token_type: String,
    /// The `data` object the issuer embedded at issue time.
    pub payload: serde_json::Value,
    /// 1-based index of this scan.
    pub scan_index: i32,
    pub scans_remaining: i32,
    /// Advisory anomaly signal; never blocks the redemption itself.
    pub suspicious_device: bool,
    /// Session token minted for `auth`-kind redemptions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/faucet/issue
///
/// Mint a signed faucet token, persist its redemption row, and append a
/// `token_issued` ledger entry. Row and ledger entry commit together.
pub async fn issue(
    State(state): State<AppState>,
    Json(input): Json<IssueTokenRequest>,
) -> AppResult<Json<DataResponse<IssueTokenResponse>>> {
    if input.token_type.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "token_type must not be empty".into(),
        )));
    }
    if !input.payload.is_object() {
        return Err(AppError::Core(CoreError::Validation(
            "payload must be a JSON object".into(),
        )));
    }

    let ttl_secs = input
        .ttl_secs
        .unwrap_or(state.config.signing.default_token_ttl_secs);
    if ttl_secs <= 0 {
        return Err(AppError::Core(CoreError::Validation(
            "ttl_secs must be positive".into(),
        )));
    }

    let max_scans = match input.single_use {
        Some(true) => 1,
        _ => input.max_scans.unwrap_or(1),
    };
    if !(1..=MAX_SCANS_LIMIT).contains(&max_scans) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "max_scans must be between 1 and {MAX_SCANS_LIMIT}"
        ))));
    }

    let token_id = Uuid::new_v4();
    let envelope_payload = json!({
        "kind": input.token_type,
        "token_id": token_id,
        "data": input.payload,
    });
    let token = state
        .codec
        .encode(&envelope_payload, chrono::Duration::seconds(ttl_secs));
    let expires_at = Utc::now() + chrono::Duration::seconds(ttl_secs);

    let mut tx = state.pool.begin().await?;

    let create = CreateFaucetToken {
        token_uuid: token_id,
        token_type: input.token_type.clone(),
        payload_json: input.payload,
        single_use: max_scans == 1,
        max_scans,
        expires_at,
    };
    let row = FaucetRepo::create(&mut tx, &create).await?;

    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::TOKEN_ISSUED,
        Some(&token_id.to_string()),
        &json!({
            "token_id": token_id,
            "token_type": row.token_type,
            "max_scans": row.max_scans,
            "expires_at": row.expires_at,
        }),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(%token_id, token_type = %row.token_type, max_scans, "Faucet token issued");

    Ok(Json(DataResponse::new(IssueTokenResponse {
        token,
        token_id,
        token_type: row.token_type,
        max_scans: row.max_scans,
        expires_at: row.expires_at,
    })))
}

/// POST /api/v1/faucet/redeem/{token}
///
/// Verify the token cryptographically, then atomically claim one scan,
/// record the redeeming device, and append a `token_redeemed` ledger entry,
/// all in one transaction. A token past its scan budget fails with
/// `AlreadyConsumed` and leaves the ledger untouched.
pub async fn redeem(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<RedeemTokenResponse>>> {
    // Crypto first: a forged, tampered, or expired token never touches
    // the database.
    let decoded = state.codec.decode(&token)?;

    let token_id = extract_uuid(&decoded.payload, "token_id")?;
    let kind = decoded
        .payload
        .get("kind")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let attrs = device_attributes(&headers);
    let device_hash = device::fingerprint(&attrs);

    let mut tx = state.pool.begin().await?;

    let Some(row) = FaucetRepo::claim_scan(&mut tx, token_id).await? else {
        tx.rollback().await?;
        // Distinguish "spent" from "never persisted" for the caller.
        return match FaucetRepo::find_by_uuid(&state.pool, token_id).await? {
            Some(_) => Err(AppError::Faucet(FaucetError::AlreadyConsumed)),
            None => Err(AppError::Faucet(FaucetError::NotFound)),
        };
    };

    DeviceRepo::touch(&mut tx, &device_hash).await?;

    // Auth-kind tokens carry the user to log in; link the device to them.
    let user_id = match kind.as_str() {
        AUTH_TOKEN_KIND => Some(extract_user_id(&decoded.payload)?),
        _ => None,
    };
    if let Some(uid) = user_id {
        UserRepo::find_by_id(&state.pool, uid)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!("unknown user id {uid}")))
            })?;
        DeviceRepo::link(&mut tx, &device_hash, uid).await?;
    }

    let linked_users =
        DeviceRepo::distinct_users_in_window(&mut tx, &device_hash, SUSPICIOUS_WINDOW_HOURS)
            .await?;
    let suspicious_device = device::is_suspicious(linked_users);

    let scan_index = row.scan_count;
    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::TOKEN_REDEEMED,
        Some(&token_id.to_string()),
        &json!({
            "token_id": token_id,
            "device_hash": device_hash,
            "scan_index": scan_index,
            "suspicious_device": suspicious_device,
        }),
    )
    .await?;

    tx.commit().await?;

    if suspicious_device {
        tracing::warn!(%token_id, %device_hash, linked_users, "Suspicious device redeemed a token");
    }

    let session_token = match user_id {
        Some(uid) => Some(
            generate_session_token(
                uid,
                &state.config.signing.secret,
                state.config.signing.session_ttl_mins,
            )
            .map_err(|e| AppError::InternalError(format!("Session generation error: {e}")))?,
        ),
        None => None,
    };

    let scans_remaining = row.scans_remaining();
    Ok(Json(DataResponse::new(RedeemTokenResponse {
        token_id,
        token_type: row.token_type,
        payload: row.payload_json,
        scan_index,
        scans_remaining,
        suspicious_device,
        session_token,
        user_id,
    })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collect device attributes from request headers.
fn device_attributes(headers: &HeaderMap) -> DeviceAttributes {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    DeviceAttributes {
        user_agent: header("user-agent"),
        // First hop only: a coarse network identifier, not a trust anchor.
        coarse_network_id: header("x-forwarded-for")
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string()),
        client_device_id: header("x-device-id"),
    }
}

/// Pull a UUID field out of a verified envelope payload.
///
/// A verified signature over a payload missing its id means the token was
/// minted by something other than this service's issue path.
fn extract_uuid(payload: &serde_json::Value, field: &str) -> Result<Uuid, AppError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Codec(CodecError::Malformed))
}

/// Pull the user id out of an auth-kind envelope's `data` object.
fn extract_user_id(payload: &serde_json::Value) -> Result<DbId, AppError> {
    payload
        .get("data")
        .and_then(|d| d.get("user_id"))
        .and_then(|v| v.as_i64())
        .ok_or(AppError::Codec(CodecError::Malformed))
}
