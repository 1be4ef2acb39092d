use crate::crypto::challenge::{DEFAULT_MAX_OUTSTANDING_CHALLENGES, MAX_CHALLENGE_TTL_SECS};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;

/// Lifetime of a session token: 24 hours
pub const SESSION_TTL_SECS: i64 = 86_400;

/// Secret used when `JWT_SECRET` is not set.
///
/// Anyone who reads this source can mint tokens with it. Never run a
/// production deployment without `JWT_SECRET`.
pub const DEVELOPMENT_JWT_SECRET: &str = "shreddr-insecure-development-secret";

pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 60;

/// Configuration for session token creation and validation
///
/// This struct contains the settings needed for JWT operations:
/// - The server secret used to sign and verify tokens (HMAC-SHA256)
/// - Token lifetime (TTL) in seconds
///
/// It is built once at start-up and handed to the services that need it;
/// nothing reads the secret from ambient state.
///
/// # Example
/// ```rust
/// use shreddr_auth::JwtConfig;
/// use secrecy::Secret;
///
/// let config = JwtConfig::new(Secret::new("your-256-bit-secret".to_string()));
/// assert_eq!(config.ttl, 86_400);
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct JwtConfig {
    /// Server secret, used as raw HMAC key bytes
    ///
    /// Should be at least 32 bytes of random data and kept out of version
    /// control.
    pub secret: Secret<String>,
    /// JWT Time To Live (TTL) in seconds
    pub ttl: i64,
}

impl JwtConfig {
    pub fn new(secret: Secret<String>) -> Self {
        Self {
            secret,
            ttl: SESSION_TTL_SECS,
        }
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

/// Process configuration for the auth server
#[derive(Clone)]
pub struct Config {
    pub jwt: JwtConfig,
    /// True when `JWT_SECRET` was absent and the development secret is in use
    pub using_development_secret: bool,
    pub bind_addr: SocketAddr,
    /// Require a server-issued nonce instead of signing the public key
    pub nonce_challenges: bool,
    pub challenge_ttl_secs: i64,
    /// Upper bound on outstanding challenges
    pub max_outstanding_challenges: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_ttl", &self.jwt.ttl)
            .field("using_development_secret", &self.using_development_secret)
            .field("bind_addr", &self.bind_addr)
            .field("nonce_challenges", &self.nonce_challenges)
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("max_outstanding_challenges", &self.max_outstanding_challenges)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env is optional; production sets variables directly
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (secret, using_development_secret) = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => (secret, false),
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set, using the development secret; do not use in production"
                );
                (DEVELOPMENT_JWT_SECRET.to_string(), true)
            }
        };

        let address = non_empty(lookup("ADDRESS")).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = non_empty(lookup("PORT")).unwrap_or_else(|| "8080".to_string());
        let bind_addr = format!("{}:{}", address, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("ADDRESS/PORT".to_string(), e.to_string()))?;

        let nonce_challenges = parse_or_default(&lookup, "AUTH_NONCE_CHALLENGES", false)?;
        let challenge_ttl_secs =
            parse_or_default(&lookup, "CHALLENGE_TTL_SECS", DEFAULT_CHALLENGE_TTL_SECS)?;
        if !(1..=MAX_CHALLENGE_TTL_SECS).contains(&challenge_ttl_secs) {
            return Err(ConfigError::InvalidValue(
                "CHALLENGE_TTL_SECS".to_string(),
                format!("must be between 1 and {}", MAX_CHALLENGE_TTL_SECS),
            ));
        }
        let max_outstanding_challenges = parse_or_default(
            &lookup,
            "MAX_OUTSTANDING_CHALLENGES",
            DEFAULT_MAX_OUTSTANDING_CHALLENGES,
        )?;
        if max_outstanding_challenges == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_OUTSTANDING_CHALLENGES".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Config {
            jwt: JwtConfig::new(Secret::new(secret)),
            using_development_secret,
            bind_addr,
            nonce_challenges,
            challenge_ttl_secs,
            max_outstanding_challenges,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup(key)) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        None => Ok(default),
    }
}
