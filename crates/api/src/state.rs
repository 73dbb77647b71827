use std::sync::Arc;

use sigil_core::codec::TokenCodec;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: sigil_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Token codec, constructed once from the signing secrets at startup.
    /// Read-only for the life of the process.
    pub codec: Arc<TokenCodec>,
}
