use crate::{config::JwtConfig, error::TokenError, identity::Identity};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The only algorithm this server issues or accepts
pub const ALGORITHM: Algorithm = Algorithm::HS256;
const ALGORITHM_NAME: &str = "HS256";

/// JWT claims for an authenticated wallet session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Wallet identity (base58 public key)
    pub sub: String,
    /// Expiration timestamp (Unix timestamp)
    pub exp: i64,
    /// Issued at timestamp (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Session identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// A freshly minted session token
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: i64,
}

/// Untrusted header, read before the signature is checked
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Untrusted payload; each field is checked individually
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    exp: Option<Value>,
    #[serde(default)]
    iat: Option<Value>,
    #[serde(default)]
    jti: Option<Value>,
}

/// Creates a signed JWT for an authenticated wallet
///
/// # Arguments
/// * `identity` - The wallet identity the session belongs to
/// * `config` - JWT configuration with secret and TTL
///
/// # Returns
/// * `Ok(IssuedToken)` - Signed token with its session id and expiry
/// * `Err(TokenError::EncodingFailure)` - The signing primitive failed
///
/// # Example
/// ```rust
/// use ed25519_dalek::SigningKey;
/// use rand::rngs::OsRng;
/// use secrecy::Secret;
/// use shreddr_auth::{crypto::jwt::{create_jwt, validate_token}, Identity, JwtConfig};
///
/// let config = JwtConfig::new(Secret::new("secret-key".to_string()));
/// let identity = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
///
/// let issued = create_jwt(&identity, &config).unwrap();
/// let claims = validate_token(&issued.token, &config).unwrap();
/// assert_eq!(claims.sub, identity.as_str());
/// ```
pub fn create_jwt(identity: &Identity, config: &JwtConfig) -> Result<IssuedToken, TokenError> {
    create_jwt_at(identity, config, Utc::now())
}

/// [`create_jwt`] with an explicit issue time
pub fn create_jwt_at(
    identity: &Identity,
    config: &JwtConfig,
    now: DateTime<Utc>,
) -> Result<IssuedToken, TokenError> {
    let session_id = Uuid::new_v4();
    let issued_at = now.timestamp();
    let expires_at = issued_at + config.ttl;

    let claims = Claims {
        sub: identity.as_str().to_string(),
        exp: expires_at,
        iat: Some(issued_at),
        jti: Some(session_id.to_string()),
    };
    let token = encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(config.secret_bytes()),
    )
    .map_err(|e| TokenError::EncodingFailure(format!("Failed to create JWT: {}", e)))?;

    Ok(IssuedToken {
        token,
        session_id,
        expires_at,
    })
}

/// Validates a JWT token and extracts the claims
///
/// Checks run in a fixed order and the first failure is returned:
/// 1. envelope parses (`Malformed`)
/// 2. header algorithm equals [`ALGORITHM`] (`WrongAlgorithm`)
/// 3. HMAC matches under the server secret (`BadSignature`)
/// 4. current time is before `exp` (`Expired`)
/// 5. `sub` is a non-empty string (`MissingSubject`)
///
/// # Arguments
/// * `token` - JWT token string to validate
/// * `config` - JWT configuration with secret for verification
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    validate_token_at(token, config, Utc::now())
}

/// [`validate_token`] evaluated at an explicit time
pub fn validate_token_at(
    token: &str,
    config: &JwtConfig,
    now: DateTime<Utc>,
) -> Result<Claims, TokenError> {
    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| TokenError::Malformed("expected three segments".to_string()))?;
    let (header_segment, payload_segment) = signing_input
        .split_once('.')
        .ok_or_else(|| TokenError::Malformed("expected three segments".to_string()))?;
    if payload_segment.contains('.') {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    }

    let header: RawHeader = decode_segment(header_segment, "header")?;
    let raw: RawClaims = decode_segment(payload_segment, "payload")?;

    // Pinned by the verifier; the token's own claim is only compared against it
    if header.alg != ALGORITHM_NAME {
        return Err(TokenError::WrongAlgorithm(header.alg));
    }

    let verified = jsonwebtoken::crypto::verify(
        signature,
        signing_input.as_bytes(),
        &DecodingKey::from_secret(config.secret_bytes()),
        ALGORITHM,
    )
    .unwrap_or(false);
    if !verified {
        return Err(TokenError::BadSignature);
    }

    let exp = raw
        .exp
        .as_ref()
        .and_then(numeric_date)
        .ok_or_else(|| TokenError::Malformed("exp claim missing or not numeric".to_string()))?;
    if is_expired(now, exp) {
        return Err(TokenError::Expired);
    }

    let sub = match raw.sub {
        Some(Value::String(sub)) if !sub.is_empty() => sub,
        _ => return Err(TokenError::MissingSubject),
    };

    Ok(Claims {
        sub,
        exp: exp.floor() as i64,
        iat: raw
            .iat
            .as_ref()
            .and_then(numeric_date)
            .map(|iat| iat.floor() as i64),
        jti: match raw.jti {
            Some(Value::String(jti)) => Some(jti),
            _ => None,
        },
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    name: &str,
) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{} is not base64url: {}", name, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("{} is not valid JSON: {}", name, e)))
}

/// JWT NumericDate: integer or fractional seconds
fn numeric_date(value: &Value) -> Option<f64> {
    value.as_f64().filter(|f| f.is_finite())
}

/// `now >= exp`, compared to the nanosecond when `exp` has a fraction
fn is_expired(now: DateTime<Utc>, exp: f64) -> bool {
    let whole = exp.floor();
    let secs = now.timestamp() as f64;
    if secs != whole {
        return secs > whole;
    }
    f64::from(now.timestamp_subsec_nanos()) / 1e9 >= exp - whole
}
