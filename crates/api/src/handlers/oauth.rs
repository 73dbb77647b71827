//! Handlers for the `/oauth` resource (client registration, authorize,
//! token exchange, userinfo, revocation, secret rotation).
//!
//! Authorization codes and access tokens are both signed codec envelopes;
//! the database rows keyed by the embedded uuid carry the single-use and
//! revocation state. OAuth responses are returned unenveloped, in the
//! shapes relying parties expect.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::{Form, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use sigil_core::codec::CodecError;
use sigil_core::error::{CoreError, OAuthError};
use sigil_core::ledger::{event_types, DEFAULT_LEDGER};
use sigil_core::oauth::{
    self, MAX_CLIENT_NAME_LENGTH, MAX_REDIRECT_URIS,
};
use sigil_core::types::{DbId, Timestamp};
use sigil_db::models::access_token::CreateAccessToken;
use sigil_db::models::auth_code::CreateAuthCode;
use sigil_db::models::oauth_client::{CreateOAuthClient, OAuthClient};
use sigil_db::repositories::{AccessTokenRepo, AuthCodeRepo, LedgerRepo, OAuthClientRepo};

use crate::auth::client_secret::{hash_client_secret, verify_client_secret};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /oauth/register-client`.
#[derive(Debug, Deserialize)]
pub struct RegisterClientRequest {
    pub client_name: String,
    pub redirect_uris: Vec<String>,
}

/// Response body for `POST /oauth/register-client`.
///
/// The plaintext secret appears here exactly once; only its hash is stored.
#[derive(Debug, Serialize)]
pub struct RegisterClientResponse {
    pub client_id: String,
    pub client_secret: String,
    pub client_name: String,
    pub redirect_uris: Vec<String>,
}

/// Query / body parameters for the authorize endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: String,
    pub state: Option<String>,
}

/// JSON shape returned by `POST /oauth/authorize`.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Form body for `POST /oauth/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Response body for `POST /oauth/token`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub scope: String,
}

/// Response body for `GET /oauth/userinfo`.
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub user_id: DbId,
    pub scope: String,
    pub client_id: String,
}

/// Request body for `POST /oauth/revoke`.
#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    /// The encoded access token to revoke.
    pub token: String,
}

/// Response body for `POST /oauth/revoke`.
#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    /// Whether this call actually flipped the token to revoked.
    pub revoked: bool,
}

/// Request body for `POST /oauth/clients/{client_id}/rotate-secret`.
#[derive(Debug, Deserialize)]
pub struct RotateSecretRequest {
    /// The current secret, proving control of the client.
    pub client_secret: String,
}

/// Response body for secret rotation. The new plaintext appears exactly once.
#[derive(Debug, Serialize)]
pub struct RotateSecretResponse {
    pub client_id: String,
    pub client_secret: String,
    pub rotated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/oauth/register-client
///
/// Register a relying-party client. Generates random credentials, stores
/// only the argon2 hash of the secret, and appends a `client_registered`
/// ledger entry.
pub async fn register_client(
    State(state): State<AppState>,
    Json(input): Json<RegisterClientRequest>,
) -> AppResult<(StatusCode, Json<RegisterClientResponse>)> {
    let client_name = input.client_name.trim().to_string();
    if client_name.is_empty() || client_name.len() > MAX_CLIENT_NAME_LENGTH {
        return Err(AppError::Core(CoreError::Validation(format!(
            "client_name must be between 1 and {MAX_CLIENT_NAME_LENGTH} characters"
        ))));
    }
    if input.redirect_uris.is_empty() || input.redirect_uris.len() > MAX_REDIRECT_URIS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "between 1 and {MAX_REDIRECT_URIS} redirect_uris are required"
        ))));
    }
    for uri in &input.redirect_uris {
        oauth::validate_redirect_uri(uri)?;
    }

    let creds = oauth::generate_client_credentials();
    let secret_hash = hash_client_secret(&creds.client_secret)
        .map_err(|e| AppError::InternalError(format!("Secret hashing error: {e}")))?;

    let create = CreateOAuthClient {
        client_id: creds.client_id.clone(),
        client_secret_hash: secret_hash,
        client_name,
        redirect_uris: input.redirect_uris,
    };
    // The row and its ledger entry commit together; a failed append leaves
    // no orphaned client behind.
    let mut tx = state.pool.begin().await?;
    let client = OAuthClientRepo::create(&mut tx, &create).await?;
    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::CLIENT_REGISTERED,
        Some(&client.client_id),
        &json!({
            "client_id": client.client_id,
            "client_name": client.client_name,
            "redirect_uris": client.redirect_uris,
        }),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(client_id = %client.client_id, "OAuth client registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterClientResponse {
            client_id: client.client_id,
            client_secret: creds.client_secret,
            client_name: client.client_name,
            redirect_uris: client.redirect_uris,
        }),
    ))
}

/// GET /api/v1/oauth/authorize
///
/// Issue an authorization code for the authenticated user and 303-redirect
/// back to the relying party with `?code=...&state=...`.
pub async fn authorize_redirect(
    State(state): State<AppState>,
    session: AuthSession,
    Query(params): Query<AuthorizeParams>,
) -> AppResult<Redirect> {
    let code = issue_auth_code(&state, session.user_id, &params).await?;

    // Query values go back out percent-encoded; `state` in particular is an
    // opaque relying-party value that may contain URL metacharacters.
    let mut location = format!(
        "{}?code={}",
        params.redirect_uri,
        urlencoding::encode(&code)
    );
    if let Some(rp_state) = &params.state {
        location.push_str("&state=");
        location.push_str(&urlencoding::encode(rp_state));
    }
    Ok(Redirect::to(&location))
}

/// POST /api/v1/oauth/authorize
///
/// Same flow as the GET variant, returning `{code, state}` as JSON for
/// clients driving the flow without browser redirects.
pub async fn authorize_json(
    State(state): State<AppState>,
    session: AuthSession,
    Json(params): Json<AuthorizeParams>,
) -> AppResult<Json<AuthorizeResponse>> {
    let code = issue_auth_code(&state, session.user_id, &params).await?;
    Ok(Json(AuthorizeResponse {
        code,
        state: params.state,
    }))
}

/// POST /api/v1/oauth/token
///
/// Exchange an authorization code for an access token. The code flips
/// `consumed` exactly once; replaying it revokes every token it ever
/// produced.
pub async fn token(
    State(state): State<AppState>,
    Form(input): Form<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let client = require_client(&state, &input.client_id).await?;
    let secret_ok = verify_client_secret(&input.client_secret, &client.client_secret_hash)
        .map_err(|e| AppError::InternalError(format!("Secret verification error: {e}")))?;
    if !secret_ok {
        return Err(AppError::OAuth(OAuthError::InvalidClientSecret));
    }

    // Codes are codec envelopes; expiry surfaces as the OAuth-specific error.
    let decoded = state.codec.decode(&input.code).map_err(|err| match err {
        CodecError::Expired => AppError::OAuth(OAuthError::CodeExpired),
        other => AppError::Codec(other),
    })?;
    let code_id = extract_uuid(&decoded.payload, "code_id")?;

    let mut tx = state.pool.begin().await?;

    let Some(code_row) = AuthCodeRepo::consume(&mut tx, code_id).await? else {
        tx.rollback().await?;
        return handle_code_replay(&state, code_id).await;
    };

    // The stored binding must match what the client presents now.
    if code_row.client_id != input.client_id {
        return Err(AppError::OAuth(OAuthError::InvalidClientSecret));
    }
    if code_row.redirect_uri != input.redirect_uri {
        return Err(AppError::OAuth(OAuthError::RedirectMismatch));
    }

    let ttl_secs = state.config.signing.access_token_ttl_secs;
    let token_id = Uuid::new_v4();
    let access_token = state.codec.encode(
        &json!({
            "kind": "access_token",
            "token_id": token_id,
            "user_id": code_row.user_id,
            "client_id": code_row.client_id,
            "scope": code_row.scope,
        }),
        chrono::Duration::seconds(ttl_secs),
    );

    let create = CreateAccessToken {
        token_uuid: token_id,
        auth_code_id: Some(code_row.id),
        client_id: code_row.client_id.clone(),
        user_id: code_row.user_id,
        scope: code_row.scope.clone(),
        expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs),
    };
    AccessTokenRepo::create(&mut tx, &create).await?;

    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::TOKEN_EXCHANGED,
        Some(&code_id.to_string()),
        &json!({
            "code_id": code_id,
            "token_id": token_id,
            "client_id": code_row.client_id,
            "user_id": code_row.user_id,
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: ttl_secs,
        scope: code_row.scope,
    }))
}

/// GET /api/v1/oauth/userinfo
///
/// Resolve a Bearer access token to its user, scope, and client.
pub async fn userinfo(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<UserInfoResponse>> {
    let token = bearer_token(&headers)?;

    let decoded = state.codec.decode(token).map_err(|err| match err {
        CodecError::Expired => AppError::OAuth(OAuthError::TokenExpired),
        other => AppError::Codec(other),
    })?;
    let token_id = extract_uuid(&decoded.payload, "token_id")?;

    let row = AccessTokenRepo::find_by_uuid(&state.pool, token_id)
        .await?
        .ok_or(AppError::OAuth(OAuthError::TokenRevoked))?;

    if row.revoked {
        return Err(AppError::OAuth(OAuthError::TokenRevoked));
    }
    if row.expires_at <= Utc::now() {
        return Err(AppError::OAuth(OAuthError::TokenExpired));
    }

    Ok(Json(UserInfoResponse {
        user_id: row.user_id,
        scope: row.scope,
        client_id: row.client_id,
    }))
}

/// POST /api/v1/oauth/revoke
///
/// Revoke an access token. Idempotent: the ledger entry is appended only
/// when the token actually flips to revoked.
pub async fn revoke(
    State(state): State<AppState>,
    Json(input): Json<RevokeRequest>,
) -> AppResult<Json<RevokeResponse>> {
    let decoded = match state.codec.decode(&input.token) {
        Ok(decoded) => decoded,
        // An expired token is already unusable; revocation is a no-op.
        Err(CodecError::Expired) => return Ok(Json(RevokeResponse { revoked: false })),
        Err(other) => return Err(AppError::Codec(other)),
    };
    let token_id = extract_uuid(&decoded.payload, "token_id")?;

    let mut tx = state.pool.begin().await?;

    let flipped = AccessTokenRepo::revoke(&mut tx, token_id).await?;
    if flipped {
        LedgerRepo::append_in_tx(
            &mut tx,
            DEFAULT_LEDGER,
            event_types::ACCESS_TOKEN_REVOKED,
            Some(&token_id.to_string()),
            &json!({ "token_id": token_id, "reason": "explicit_revocation" }),
        )
        .await?;
    }

    tx.commit().await?;

    Ok(Json(RevokeResponse { revoked: flipped }))
}

/// POST /api/v1/oauth/clients/{client_id}/rotate-secret
///
/// Replace the client secret, authenticating with the current one. The old
/// hash is invalidated in the same statement.
pub async fn rotate_secret(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(input): Json<RotateSecretRequest>,
) -> AppResult<Json<RotateSecretResponse>> {
    let client = require_client(&state, &client_id).await?;
    let secret_ok = verify_client_secret(&input.client_secret, &client.client_secret_hash)
        .map_err(|e| AppError::InternalError(format!("Secret verification error: {e}")))?;
    if !secret_ok {
        return Err(AppError::OAuth(OAuthError::InvalidClientSecret));
    }

    let new_secret = oauth::generate_client_secret();
    let new_hash = hash_client_secret(&new_secret)
        .map_err(|e| AppError::InternalError(format!("Secret hashing error: {e}")))?;

    // The hash swap and its ledger entry commit together, so the returned
    // plaintext always corresponds to the persisted hash.
    let mut tx = state.pool.begin().await?;
    OAuthClientRepo::rotate_secret(&mut tx, &client_id, &new_hash).await?;
    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::CLIENT_SECRET_ROTATED,
        Some(&client_id),
        &json!({ "client_id": client_id }),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(%client_id, "OAuth client secret rotated");

    Ok(Json(RotateSecretResponse {
        client_id,
        client_secret: new_secret,
        rotated_at: Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate an authorize request and mint a single-use code for the user.
async fn issue_auth_code(
    state: &AppState,
    user_id: DbId,
    params: &AuthorizeParams,
) -> AppResult<String> {
    let client = require_client(state, &params.client_id).await?;

    if !oauth::redirect_uri_matches(&client.redirect_uris, &params.redirect_uri) {
        return Err(AppError::OAuth(OAuthError::RedirectMismatch));
    }
    oauth::validate_scope(&params.scope)?;

    let ttl_secs = state.config.signing.auth_code_ttl_secs;
    let code_id = Uuid::new_v4();
    let code = state.codec.encode(
        &json!({
            "kind": "auth_code",
            "code_id": code_id,
            "client_id": params.client_id,
            "user_id": user_id,
        }),
        chrono::Duration::seconds(ttl_secs),
    );

    let mut tx = state.pool.begin().await?;

    let create = CreateAuthCode {
        code_uuid: code_id,
        client_id: params.client_id.clone(),
        user_id,
        redirect_uri: params.redirect_uri.clone(),
        scope: params.scope.clone(),
        expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs),
    };
    AuthCodeRepo::create(&mut tx, &create).await?;

    LedgerRepo::append_in_tx(
        &mut tx,
        DEFAULT_LEDGER,
        event_types::AUTH_CODE_ISSUED,
        Some(&code_id.to_string()),
        &json!({
            "code_id": code_id,
            "client_id": params.client_id,
            "user_id": user_id,
            "scope": params.scope,
        }),
    )
    .await?;

    tx.commit().await?;

    Ok(code)
}

/// A signed code that failed the consume step was either already spent
/// (replay) or never persisted. Replays revoke every access token the code
/// produced, each with its own ledger entry.
async fn handle_code_replay(
    state: &AppState,
    code_id: Uuid,
) -> AppResult<Json<TokenResponse>> {
    let Some(code_row) = AuthCodeRepo::find_by_uuid(&state.pool, code_id).await? else {
        return Err(AppError::BadRequest(
            "Unknown authorization code".to_string(),
        ));
    };

    let mut tx = state.pool.begin().await?;
    let revoked = AccessTokenRepo::revoke_all_for_code(&mut tx, code_row.id).await?;
    for token_id in &revoked {
        LedgerRepo::append_in_tx(
            &mut tx,
            DEFAULT_LEDGER,
            event_types::ACCESS_TOKEN_REVOKED,
            Some(&token_id.to_string()),
            &json!({ "token_id": token_id, "reason": "code_replay", "code_id": code_id }),
        )
        .await?;
    }
    tx.commit().await?;

    tracing::warn!(
        %code_id,
        revoked_tokens = revoked.len(),
        "Authorization code replay detected"
    );
    Err(AppError::OAuth(OAuthError::CodeReplay))
}

/// Look up a client by public id or fail with a terse 400.
async fn require_client(state: &AppState, client_id: &str) -> AppResult<OAuthClient> {
    OAuthClientRepo::find_by_client_id(&state.pool, client_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Unknown client_id".to_string()))
}

/// Extract the Bearer token from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing or malformed Authorization header".into(),
            ))
        })
}

/// Pull a UUID field out of a verified envelope payload.
fn extract_uuid(payload: &serde_json::Value, field: &str) -> Result<Uuid, AppError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Codec(CodecError::Malformed))
}
