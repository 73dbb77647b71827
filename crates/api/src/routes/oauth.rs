//! Route definitions for the `/oauth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::oauth;
use crate::state::AppState;

/// Routes mounted at `/oauth`.
///
/// ```text
/// POST /register-client                    -> register_client
/// GET  /authorize                          -> authorize_redirect (requires session)
/// POST /authorize                          -> authorize_json (requires session)
/// POST /token                              -> token
/// GET  /userinfo                           -> userinfo
/// POST /revoke                             -> revoke
/// POST /clients/{client_id}/rotate-secret  -> rotate_secret
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-client", post(oauth::register_client))
        .route(
            "/authorize",
            get(oauth::authorize_redirect).post(oauth::authorize_json),
        )
        .route("/token", post(oauth::token))
        .route("/userinfo", get(oauth::userinfo))
        .route("/revoke", post(oauth::revoke))
        .route(
            "/clients/{client_id}/rotate-secret",
            post(oauth::rotate_secret),
        )
}
