//! Route definitions for the `/ledger` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::ledger;
use crate::state::AppState;

/// Routes mounted at `/ledger`.
///
/// ```text
/// GET /verify   -> verify
/// GET /entries  -> entries
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify", get(ledger::verify))
        .route("/entries", get(ledger::entries))
}
