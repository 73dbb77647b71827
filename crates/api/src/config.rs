use sigil_core::codec::SigningKeys;

/// Maximum allowed authorization-code TTL in seconds (10 minutes).
const MAX_AUTH_CODE_TTL_SECS: i64 = 600;

/// Signing and TTL configuration for every credential the service mints.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Current HMAC-SHA256 signing secret.
    pub secret: String,
    /// Immediately previous secret, accepted for verification only during
    /// a rotation grace window.
    pub previous_secret: Option<String>,
    /// Default faucet token TTL in seconds.
    pub default_token_ttl_secs: i64,
    /// Authorization code TTL in seconds (capped at 600).
    pub auth_code_ttl_secs: i64,
    /// Access token TTL in seconds.
    pub access_token_ttl_secs: i64,
    /// User session token lifetime in minutes.
    pub session_ttl_mins: i64,
}

impl SigningConfig {
    /// Load signing configuration from environment variables.
    ///
    /// | Env Var                   | Required | Default |
    /// |---------------------------|----------|---------|
    /// | `SIGNING_SECRET`          | **yes**  | --      |
    /// | `SIGNING_SECRET_PREVIOUS` | no       | unset   |
    /// | `DEFAULT_TOKEN_TTL_SECS`  | no       | `300`   |
    /// | `AUTH_CODE_TTL_SECS`      | no       | `600`   |
    /// | `ACCESS_TOKEN_TTL_SECS`   | no       | `3600`  |
    /// | `SESSION_TTL_MINS`        | no       | `60`    |
    ///
    /// # Panics
    ///
    /// Panics if `SIGNING_SECRET` is not set or is empty, if any TTL is
    /// zero or negative, or if `AUTH_CODE_TTL_SECS` exceeds 600 seconds.
    pub fn from_env() -> Self {
        let secret = std::env::var("SIGNING_SECRET")
            .expect("SIGNING_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "SIGNING_SECRET must not be empty");

        let previous_secret = std::env::var("SIGNING_SECRET_PREVIOUS")
            .ok()
            .filter(|s| !s.is_empty());

        let default_token_ttl_secs = env_positive_i64("DEFAULT_TOKEN_TTL_SECS", 300);
        let auth_code_ttl_secs = env_positive_i64("AUTH_CODE_TTL_SECS", MAX_AUTH_CODE_TTL_SECS);
        assert!(
            auth_code_ttl_secs <= MAX_AUTH_CODE_TTL_SECS,
            "AUTH_CODE_TTL_SECS must not exceed {MAX_AUTH_CODE_TTL_SECS} seconds"
        );
        let access_token_ttl_secs = env_positive_i64("ACCESS_TOKEN_TTL_SECS", 3600);
        let session_ttl_mins = env_positive_i64("SESSION_TTL_MINS", 60);

        Self {
            secret,
            previous_secret,
            default_token_ttl_secs,
            auth_code_ttl_secs,
            access_token_ttl_secs,
            session_ttl_mins,
        }
    }

    /// The key pair handed to the token codec.
    pub fn signing_keys(&self) -> SigningKeys {
        SigningKeys {
            current: self.secret.clone(),
            previous: self.previous_secret.clone(),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the signing secret have sensible defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Signing secrets and credential TTLs.
    pub signing: SigningConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let signing = SigningConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            signing,
        }
    }
}

/// TTLs of zero or less would mint instantly-expired credentials, so they
/// are configuration errors.
fn env_positive_i64(name: &str, default: i64) -> i64 {
    let value: i64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid i64"));
    assert!(value > 0, "{name} must be positive, got {value}");
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own env var name so parallel tests cannot race.

    #[test]
    fn positive_ttl_values_pass() {
        std::env::set_var("CONFIG_TEST_TTL_OK", "120");
        assert_eq!(env_positive_i64("CONFIG_TEST_TTL_OK", 60), 120);
        assert_eq!(env_positive_i64("CONFIG_TEST_TTL_UNSET", 60), 60);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn zero_ttl_is_rejected() {
        std::env::set_var("CONFIG_TEST_TTL_ZERO", "0");
        env_positive_i64("CONFIG_TEST_TTL_ZERO", 60);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn negative_ttl_is_rejected() {
        std::env::set_var("CONFIG_TEST_TTL_NEGATIVE", "-5");
        env_positive_i64("CONFIG_TEST_TTL_NEGATIVE", 60);
    }
}
