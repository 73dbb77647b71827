//! HTTP-level integration tests for the faucet endpoints.
//!
//! Covers issue/redeem round trips, scan budgets under concurrency, the
//! ledger entries each operation appends, and QR login session minting.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, expect_status, get, post_json, post_with_headers};
use serde_json::json;
use sqlx::PgPool;

use sigil_core::codec::{SigningKeys, TokenCodec};
use sigil_db::models::user::CreateUser;
use sigil_db::repositories::UserRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a token through the API and return `(encoded_token, token_id)`.
async fn issue_token(app: axum::Router, body: serde_json::Value) -> (String, String) {
    let response = post_json(app, "/api/v1/faucet/issue", body).await;
    let json = expect_status(response, StatusCode::OK).await;
    (
        json["data"]["token"].as_str().unwrap().to_string(),
        json["data"]["token_id"].as_str().unwrap().to_string(),
    )
}

/// A codec wired with the same secret the test app signs with.
fn test_codec() -> TokenCodec {
    TokenCodec::new(SigningKeys {
        current: common::TEST_SECRET.to_string(),
        previous: None,
    })
}

// ---------------------------------------------------------------------------
// Issue / redeem round trip
// ---------------------------------------------------------------------------

/// Full voucher scenario: issue, redeem once, payload comes back, exactly
/// two ledger entries exist and the chain verifies, a second redeem fails
/// with 409 and leaves the ledger untouched.
#[sqlx::test(migrations = "../db/migrations")]
async fn issue_then_redeem_single_use(pool: PgPool) {
    let app = build_test_app(pool);

    let (token, token_id) = issue_token(
        app.clone(),
        json!({
            "token_type": "voucher",
            "payload": { "amount": 5, "currency": "credits" },
            "single_use": true,
        }),
    )
    .await;

    // First redemption succeeds and echoes the issued payload.
    let response = post_with_headers(
        app.clone(),
        &format!("/api/v1/faucet/redeem/{token}"),
        &[("user-agent", "Mozilla/5.0")],
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["payload"]["amount"], 5);
    assert_eq!(json["data"]["token_type"], "voucher");
    assert_eq!(json["data"]["scan_index"], 1);
    assert_eq!(json["data"]["scans_remaining"], 0);
    assert_eq!(json["data"]["suspicious_device"], false);

    // Exactly two ledger entries for this token: issued, redeemed.
    let response = get(
        app.clone(),
        &format!("/api/v1/ledger/entries?subject={token_id}"),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["event_type"], "token_issued");
    assert_eq!(entries[1]["event_type"], "token_redeemed");

    let response = get(app.clone(), "/api/v1/ledger/verify").await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["chain_valid"], true);
    assert_eq!(json["data"]["verified_entries"], 2);

    // Second redemption is rejected and appends nothing.
    let response = post_with_headers(
        app.clone(),
        &format!("/api/v1/faucet/redeem/{token}"),
        &[("user-agent", "Mozilla/5.0")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get(
        app,
        &format!("/api/v1/ledger/entries?subject={token_id}"),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

/// Two concurrent redemptions of a single-use token: exactly one wins.
#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_redeem_single_winner(pool: PgPool) {
    let app = build_test_app(pool);

    let (token, _) = issue_token(
        app.clone(),
        json!({
            "token_type": "voucher",
            "payload": { "seat": "A1" },
            "single_use": true,
        }),
    )
    .await;

    let uri = format!("/api/v1/faucet/redeem/{token}");
    let (a, b) = tokio::join!(
        post_with_headers(app.clone(), &uri, &[("user-agent", "racer-a")]),
        post_with_headers(app.clone(), &uri, &[("user-agent", "racer-b")]),
    );

    let statuses = [a.status(), b.status()];
    let wins = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let conflicts = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(wins, 1, "exactly one redemption must win, got {statuses:?}");
    assert_eq!(conflicts, 1);
}

/// A multi-scan token allows exactly `max_scans` redemptions.
#[sqlx::test(migrations = "../db/migrations")]
async fn multi_scan_budget_enforced(pool: PgPool) {
    let app = build_test_app(pool);

    let (token, _) = issue_token(
        app.clone(),
        json!({
            "token_type": "invite",
            "payload": { "group": "beta" },
            "max_scans": 3,
        }),
    )
    .await;

    let uri = format!("/api/v1/faucet/redeem/{token}");
    for expected_index in 1..=3 {
        let response = post_with_headers(app.clone(), &uri, &[]).await;
        let json = expect_status(response, StatusCode::OK).await;
        assert_eq!(json["data"]["scan_index"], expected_index);
        assert_eq!(json["data"]["scans_remaining"], 3 - expected_index);
    }

    let response = post_with_headers(app, &uri, &[]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Rejection paths
// ---------------------------------------------------------------------------

/// Garbage and tampered tokens are rejected before touching the database.
#[sqlx::test(migrations = "../db/migrations")]
async fn forged_tokens_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    // Not even base64.
    let response = post_with_headers(app.clone(), "/api/v1/faucet/redeem/not-a-token", &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A real token with one corrupted character.
    let (token, _) = issue_token(
        app.clone(),
        json!({ "token_type": "voucher", "payload": {}, "single_use": true }),
    )
    .await;
    let mut tampered = token.clone();
    let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
    tampered.pop();
    tampered.push(flipped);

    let response =
        post_with_headers(app, &format!("/api/v1/faucet/redeem/{tampered}"), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// An expired token fails closed even though its row still exists.
#[sqlx::test(migrations = "../db/migrations")]
async fn expired_token_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    // Sign an already-expired envelope with the app's own secret.
    let token = test_codec().encode(
        &json!({
            "kind": "voucher",
            "token_id": uuid::Uuid::new_v4(),
            "data": {},
        }),
        chrono::Duration::seconds(-10),
    );

    let response = post_with_headers(app, &format!("/api/v1/faucet/redeem/{token}"), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A validly signed token with no persisted row returns 404.
#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_token_not_found(pool: PgPool) {
    let app = build_test_app(pool);

    let token = test_codec().encode(
        &json!({
            "kind": "voucher",
            "token_id": uuid::Uuid::new_v4(),
            "data": {},
        }),
        chrono::Duration::seconds(60),
    );

    let response = post_with_headers(app, &format!("/api/v1/faucet/redeem/{token}"), &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Issue-time validation: non-object payloads and bad budgets are rejected.
#[sqlx::test(migrations = "../db/migrations")]
async fn issue_validation(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/faucet/issue",
        json!({ "token_type": "voucher", "payload": [1, 2, 3] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.clone(),
        "/api/v1/faucet/issue",
        json!({ "token_type": "voucher", "payload": {}, "max_scans": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app,
        "/api/v1/faucet/issue",
        json!({ "token_type": "voucher", "payload": {}, "ttl_secs": -5 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// QR login flow
// ---------------------------------------------------------------------------

/// Redeeming an auth-kind token links the device and mints a session.
#[sqlx::test(migrations = "../db/migrations")]
async fn auth_token_mints_session(pool: PgPool) {
    let user = UserRepo::create(
        &pool,
        &CreateUser {
            username: "qr-login-user".to_string(),
        },
    )
    .await
    .expect("user creation should succeed");
    let app = build_test_app(pool.clone());

    let (token, _) = issue_token(
        app.clone(),
        json!({
            "token_type": "auth",
            "payload": { "user_id": user.id },
            "single_use": true,
        }),
    )
    .await;

    let response = post_with_headers(
        app,
        &format!("/api/v1/faucet/redeem/{token}"),
        &[("user-agent", "Mozilla/5.0"), ("x-device-id", "phone-123")],
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;

    assert_eq!(json["data"]["user_id"], user.id);
    let session_token = json["data"]["session_token"]
        .as_str()
        .expect("auth redemption must mint a session token");

    // The session validates against the app's signing secret.
    let claims =
        sigil_api::auth::session::validate_session_token(session_token, common::TEST_SECRET)
            .expect("minted session must validate");
    assert_eq!(claims.sub, user.id);

    // The device ended up linked to the user.
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*)::BIGINT FROM device_links WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

/// Non-auth redemptions never mint a session.
#[sqlx::test(migrations = "../db/migrations")]
async fn voucher_redemption_has_no_session(pool: PgPool) {
    let app = build_test_app(pool);

    let (token, _) = issue_token(
        app.clone(),
        json!({ "token_type": "voucher", "payload": { "amount": 1 }, "single_use": true }),
    )
    .await;

    let response = post_with_headers(app, &format!("/api/v1/faucet/redeem/{token}"), &[]).await;
    let json = body_json(response).await;
    assert!(json["data"]["session_token"].is_null());
    assert!(json["data"]["user_id"].is_null());
}
