use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use sigil_core::codec::CodecError;
use sigil_core::error::{CoreError, FaucetError, OAuthError};
use sigil_core::ledger::LedgerError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain taxonomies from `sigil_core` and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses. End users get terse, non-leaky messages; the precise internal
/// variant is logged, never echoed, so the response cannot be used as an
/// oracle against the signature/expiry distinction.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A generic domain error from `sigil_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A token decode failure from the crypto codec.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A faucet redemption failure.
    #[error(transparent)]
    Faucet(#[from] FaucetError),

    /// An OAuth provider failure.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// A ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Codec errors ---
            // One collapsed message for all three variants: distinguishing
            // signature failures from expiry in the response would hand an
            // attacker a forgery oracle. The variant is logged instead.
            AppError::Codec(codec) => {
                tracing::warn!(error = %codec, "Token verification failed");
                (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_TOKEN",
                    "This token is invalid or has expired".to_string(),
                )
            }

            // --- Faucet errors ---
            AppError::Faucet(FaucetError::AlreadyConsumed) => (
                StatusCode::CONFLICT,
                "ALREADY_CONSUMED",
                "This code is invalid or has already been used".to_string(),
            ),
            AppError::Faucet(FaucetError::NotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "This code is invalid or has already been used".to_string(),
            ),

            // --- OAuth errors ---
            AppError::OAuth(oauth) => match oauth {
                OAuthError::RedirectMismatch => (
                    StatusCode::BAD_REQUEST,
                    "REDIRECT_MISMATCH",
                    "Redirect URI does not match the registered value".to_string(),
                ),
                OAuthError::InvalidRedirectUri => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_REDIRECT_URI",
                    "Redirect URIs must be absolute http(s) URIs without fragments".to_string(),
                ),
                OAuthError::CodeReplay => (
                    StatusCode::BAD_REQUEST,
                    "CODE_REPLAY",
                    "This code is invalid or has already been used".to_string(),
                ),
                OAuthError::CodeExpired => (
                    StatusCode::BAD_REQUEST,
                    "CODE_EXPIRED",
                    "This code is invalid or has expired".to_string(),
                ),
                OAuthError::InvalidClientSecret => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CLIENT",
                    "Invalid client credentials".to_string(),
                ),
                OAuthError::ScopeDenied => (
                    StatusCode::BAD_REQUEST,
                    "SCOPE_DENIED",
                    "Requested scope is not allowed".to_string(),
                ),
                OAuthError::TokenExpired => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_EXPIRED",
                    "This token is invalid or has expired".to_string(),
                ),
                OAuthError::TokenRevoked => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_REVOKED",
                    "This token has been revoked".to_string(),
                ),
                OAuthError::UnauthenticatedSession => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED",
                    "An authenticated session is required".to_string(),
                ),
            },

            // --- Ledger errors ---
            AppError::Ledger(LedgerError::WriteConflict) => (
                StatusCode::CONFLICT,
                "WRITE_CONFLICT",
                "The operation conflicted with a concurrent write".to_string(),
            ),
            AppError::Ledger(LedgerError::ChainBroken { sequence }) => {
                tracing::error!(sequence, "Ledger chain broken");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CHAIN_BROKEN",
                    format!("Ledger chain broken at sequence {sequence}"),
                )
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
