//! Handlers for the `/ledger` resource (verification, subject projection).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use sigil_core::error::CoreError;
use sigil_core::ledger::{ChainVerification, DEFAULT_LEDGER};
use sigil_db::models::ledger::LedgerEntry;
use sigil_db::repositories::LedgerRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /ledger/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// Logical ledger name; defaults to the main authority ledger.
    pub ledger: Option<String>,
    /// First sequence to verify (inclusive, default 0).
    pub from: Option<i64>,
    /// Last sequence to verify (inclusive, default: current tail).
    pub to: Option<i64>,
}

/// Query parameters for `GET /ledger/entries`.
#[derive(Debug, Deserialize)]
pub struct EntriesParams {
    pub subject: String,
}

/// GET /api/v1/ledger/verify
///
/// Recompute and verify the hash chain over a sequence range. Always
/// returns 200 with the verification result; a broken chain shows up as
/// `chain_valid: false` with the first broken sequence identified.
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> AppResult<Json<DataResponse<ChainVerification>>> {
    let ledger = params.ledger.as_deref().unwrap_or(DEFAULT_LEDGER);
    let from = params.from.unwrap_or(0);

    let to = match params.to {
        Some(to) => to,
        None => match LedgerRepo::tail_sequence(&state.pool, ledger).await? {
            Some(tail) => tail,
            // Empty ledger: trivially valid.
            None => {
                return Ok(Json(DataResponse::new(ChainVerification {
                    verified_entries: 0,
                    chain_valid: true,
                    first_break: None,
                })))
            }
        },
    };

    if from < 0 || to < from {
        return Err(AppError::Core(CoreError::Validation(
            "verification range must satisfy 0 <= from <= to".into(),
        )));
    }

    let result = LedgerRepo::verify_chain(&state.pool, ledger, from, to).await?;
    Ok(Json(DataResponse::new(result)))
}

/// GET /api/v1/ledger/entries?subject=...
///
/// All entries recorded for one subject (a token, code, client, or device),
/// ordered by ledger and sequence.
pub async fn entries(
    State(state): State<AppState>,
    Query(params): Query<EntriesParams>,
) -> AppResult<Json<DataResponse<Vec<LedgerEntry>>>> {
    if params.subject.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "subject must not be empty".into(),
        )));
    }
    let entries = LedgerRepo::entries_for_subject(&state.pool, &params.subject).await?;
    Ok(Json(DataResponse::new(entries)))
}
