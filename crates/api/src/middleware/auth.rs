//! Session-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sigil_core::error::OAuthError;
use sigil_core::types::DbId;

use crate::auth::session::validate_session_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated session extracted from a Bearer token in the `Authorization` header.
///
/// Use this as an extractor parameter in any handler that requires an
/// authenticated end-user session, such as the OAuth authorize endpoint:
///
/// ```ignore
/// async fn my_handler(session: AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(user_id = session.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// The session identifier (from `claims.jti`).
    pub session_id: String,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::OAuth(OAuthError::UnauthenticatedSession))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::OAuth(OAuthError::UnauthenticatedSession))?;

        let claims = validate_session_token(token, &state.config.signing.secret)
            .map_err(|_| AppError::OAuth(OAuthError::UnauthenticatedSession))?;

        Ok(AuthSession {
            user_id: claims.sub,
            session_id: claims.jti,
        })
    }
}
