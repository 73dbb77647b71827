//! Route definitions, grouped by resource.

pub mod faucet;
pub mod health;
pub mod ledger;
pub mod oauth;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes, merged from the per-resource routers.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/faucet", faucet::router())
        .nest("/oauth", oauth::router())
        .nest("/ledger", ledger::router())
}
