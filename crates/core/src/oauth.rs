//! OAuth client credential generation and request validation helpers.
//!
//! Pure logic only: persistence of clients, codes, and access tokens lives
//! in `sigil-db`; secret hashing (argon2) lives in `sigil-api` next to the
//! other credential-hash code.

use rand::Rng;

use crate::error::OAuthError;

/// Length of a generated client id.
pub const CLIENT_ID_LENGTH: usize = 24;

/// Length of a generated client secret.
pub const CLIENT_SECRET_LENGTH: usize = 48;

/// Maximum accepted client name length.
pub const MAX_CLIENT_NAME_LENGTH: usize = 128;

/// Maximum number of redirect URIs a client may register.
pub const MAX_REDIRECT_URIS: usize = 8;

/// Freshly generated client credentials.
///
/// The plaintext secret is shown to the registrant exactly once; only its
/// argon2 hash is ever persisted.
pub struct GeneratedClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Generate a random client id + secret pair.
pub fn generate_client_credentials() -> GeneratedClientCredentials {
    GeneratedClientCredentials {
        client_id: random_alphanumeric(CLIENT_ID_LENGTH),
        client_secret: random_alphanumeric(CLIENT_SECRET_LENGTH),
    }
}

/// Generate a fresh client secret, used on rotation.
pub fn generate_client_secret() -> String {
    random_alphanumeric(CLIENT_SECRET_LENGTH)
}

fn random_alphanumeric(length: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Validate a redirect URI at client registration time.
///
/// Accepts absolute http(s) URIs without fragments. Anything else fails
/// with [`OAuthError::InvalidRedirectUri`].
pub fn validate_redirect_uri(uri: &str) -> Result<(), OAuthError> {
    let rest = uri
        .strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"))
        .ok_or(OAuthError::InvalidRedirectUri)?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(OAuthError::InvalidRedirectUri);
    }
    if uri.contains('#') {
        return Err(OAuthError::InvalidRedirectUri);
    }
    if uri.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(OAuthError::InvalidRedirectUri);
    }
    Ok(())
}

/// Check a presented redirect URI against the registered set.
///
/// Exact string match only -- no prefix, case, or query-string tolerance.
/// Partial matching is how open-redirect style code interception starts.
pub fn redirect_uri_matches(registered: &[String], presented: &str) -> bool {
    registered.iter().any(|uri| uri == presented)
}

/// Validate a requested scope string: space-separated tokens of
/// `[a-z0-9_.:-]`. An empty scope is allowed and means "default".
pub fn validate_scope(scope: &str) -> Result<(), OAuthError> {
    for token in scope.split_whitespace() {
        let ok = token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.:-".contains(c));
        if !ok {
            return Err(OAuthError::ScopeDenied);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_credentials_have_expected_lengths() {
        let creds = generate_client_credentials();
        assert_eq!(creds.client_id.len(), CLIENT_ID_LENGTH);
        assert_eq!(creds.client_secret.len(), CLIENT_SECRET_LENGTH);
        assert!(creds.client_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_credentials_are_unique() {
        let a = generate_client_credentials();
        let b = generate_client_credentials();
        assert_ne!(a.client_id, b.client_id);
        assert_ne!(a.client_secret, b.client_secret);
    }

    #[test]
    fn valid_redirect_uris_pass() {
        assert!(validate_redirect_uri("https://app.example/cb").is_ok());
        assert!(validate_redirect_uri("http://localhost:3000/callback").is_ok());
    }

    #[test]
    fn invalid_redirect_uris_fail() {
        for uri in [
            "ftp://app.example/cb",
            "app.example/cb",
            "https://",
            "https:///path-only",
            "https://app.example/cb#fragment",
            "https://app.example/cb with space",
            "javascript:alert(1)",
        ] {
            assert_eq!(
                validate_redirect_uri(uri),
                Err(OAuthError::InvalidRedirectUri),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn redirect_match_is_exact() {
        let registered = vec!["https://app.example/cb".to_string()];

        assert!(redirect_uri_matches(&registered, "https://app.example/cb"));
        // Trailing slash, case, and query-string variants all miss.
        assert!(!redirect_uri_matches(&registered, "https://app.example/cb/"));
        assert!(!redirect_uri_matches(&registered, "https://app.example/CB"));
        assert!(!redirect_uri_matches(
            &registered,
            "https://app.example/cb?extra=1"
        ));
        assert!(!redirect_uri_matches(&registered, "https://app.example/c"));
    }

    #[test]
    fn scope_charset_is_enforced() {
        assert!(validate_scope("profile openid read:ledger").is_ok());
        assert!(validate_scope("").is_ok());
        assert_eq!(validate_scope("Profile"), Err(OAuthError::ScopeDenied));
        assert_eq!(validate_scope("read;drop"), Err(OAuthError::ScopeDenied));
    }
}
