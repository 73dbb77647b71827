//! Domain error types shared across the workspace.
//!
//! The codec and ledger modules define their own error enums next to the
//! logic that produces them ([`crate::codec::CodecError`],
//! [`crate::ledger::LedgerError`]); this module holds the generic
//! [`CoreError`] plus the faucet and OAuth taxonomies.

use crate::types::DbId;

/// Generic domain-level error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup found nothing.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The operation conflicts with current state.
    #[error("{0}")]
    Conflict(String),

    /// The caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// An unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

/// Errors produced by faucet token redemption.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FaucetError {
    /// The token's scan budget is exhausted (single-use already redeemed,
    /// or `scan_count` reached `max_scans`).
    #[error("token has already been consumed")]
    AlreadyConsumed,

    /// No persisted row matches the presented token.
    #[error("token not found")]
    NotFound,
}

/// Errors produced by the OAuth provider.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    /// The presented redirect URI is not an exact match against the
    /// registered set (or, at exchange time, the URI the code was bound to).
    #[error("redirect URI does not match")]
    RedirectMismatch,

    /// A redirect URI failed validation at client registration.
    #[error("invalid redirect URI")]
    InvalidRedirectUri,

    /// An authorization code was presented a second time.
    #[error("authorization code has already been exchanged")]
    CodeReplay,

    /// The authorization code is past its TTL.
    #[error("authorization code has expired")]
    CodeExpired,

    /// Client secret verification failed.
    #[error("invalid client credentials")]
    InvalidClientSecret,

    /// The requested scope is not grantable.
    #[error("requested scope is not allowed")]
    ScopeDenied,

    /// The access token is past its TTL.
    #[error("access token has expired")]
    TokenExpired,

    /// The access token has been revoked.
    #[error("access token has been revoked")]
    TokenRevoked,

    /// `/oauth/authorize` was called without an authenticated user session.
    #[error("an authenticated session is required")]
    UnauthenticatedSession,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "faucet_token",
            id: 7,
        };
        assert_eq!(err.to_string(), "faucet_token with id 7 not found");
    }

    #[test]
    fn faucet_error_messages_are_terse() {
        // Messages are end-user visible; they must not leak internals.
        assert_eq!(
            FaucetError::AlreadyConsumed.to_string(),
            "token has already been consumed"
        );
        assert_eq!(FaucetError::NotFound.to_string(), "token not found");
    }
}
