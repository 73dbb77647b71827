//! Route definitions for the `/faucet` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::faucet;
use crate::state::AppState;

/// Routes mounted at `/faucet`.
///
/// ```text
/// POST /issue           -> issue
/// POST /redeem/{token}  -> redeem
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/issue", post(faucet::issue))
        .route("/redeem/{token}", post(faucet::redeem))
}
