use thiserror::Error;

/// Externally visible authentication errors
///
/// This enum is the taxonomy every RPC caller sees. Each variant maps to one
/// RPC code (see [`AuthError::code`]). Subsystem errors ([`DecodeError`],
/// [`TokenError`], [`DirectoryError`]) are folded into these variants before
/// they leave the service.
///
/// # Example
/// ```rust
/// use shreddr_auth::{AuthError, Result};
///
/// fn handle_auth_result(result: Result<()>) {
///     match result {
///         Ok(()) => println!("Operation successful"),
///         Err(AuthError::InvalidArgument(msg)) => println!("Bad input: {}", msg),
///         Err(AuthError::Unauthenticated(_)) => println!("Access denied"),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Caller supplied input that is structurally wrong
    ///
    /// This error occurs when:
    /// - The public key is not base58 or not a 32-byte Ed25519 point
    /// - The signature is not base58 or not 64 bytes
    /// - A required request field is missing
    ///
    /// The message is safe to return verbatim.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Signature or token failed verification
    ///
    /// The message never says which sub-check failed.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The requested user does not exist in the directory
    #[error("not found: {0}")]
    NotFound(String),

    /// Too many outstanding challenges; the caller should retry later
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Storage or signing primitive failure
    ///
    /// Logged server-side; callers only ever see an opaque message.
    #[error("internal error: {0}")]
    Internal(String),
}

/// RPC status codes used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    ResourceExhausted,
    Internal,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::InvalidArgument => "invalid_argument",
            Code::Unauthenticated => "unauthenticated",
            Code::NotFound => "not_found",
            Code::ResourceExhausted => "resource_exhausted",
            Code::Internal => "internal",
        }
    }
}

impl AuthError {
    pub fn code(&self) -> Code {
        match self {
            AuthError::InvalidArgument(_) => Code::InvalidArgument,
            AuthError::Unauthenticated(_) => Code::Unauthenticated,
            AuthError::NotFound(_) => Code::NotFound,
            AuthError::ResourceExhausted(_) => Code::ResourceExhausted,
            AuthError::Internal(_) => Code::Internal,
        }
    }

    /// Message suitable for the caller. Internal details are withheld.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::InvalidArgument(msg)
            | AuthError::Unauthenticated(msg)
            | AuthError::NotFound(msg)
            | AuthError::ResourceExhausted(msg) => msg.clone(),
            AuthError::Internal(_) => "internal error".to_string(),
        }
    }
}

/// Failure to decode a base58 public key or signature
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Public key is not base58, has the wrong length, or is not a valid
    /// Ed25519 curve point
    #[error("invalid public key: {0}")]
    PublicKey(String),

    /// Signature is not base58 or is not 64 bytes
    #[error("invalid signature: {0}")]
    Signature(String),

    /// Challenge is not base58 or has the wrong length
    #[error("invalid challenge: {0}")]
    Challenge(String),
}

/// Session token issuance and validation errors
///
/// Validation reports the first failing check in this order: envelope,
/// algorithm, signature, expiration, subject.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token is not a three-part JWS, a segment is not base64url, or the
    /// header/payload is not the expected JSON shape
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Header declares an algorithm other than the pinned one
    #[error("unexpected signing algorithm: {0}")]
    WrongAlgorithm(String),

    /// MAC recomputed with the server secret does not match
    #[error("token signature mismatch")]
    BadSignature,

    /// Current time is at or past the `exp` claim
    #[error("token has expired")]
    Expired,

    /// `sub` claim is absent, empty, or not a string
    #[error("token subject missing or invalid")]
    MissingSubject,

    /// The signing primitive failed while minting
    #[error("failed to encode token: {0}")]
    EncodingFailure(String),
}

/// User directory errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    NotFound(String),

    /// Backing store failure (connection, query, constraint)
    #[error("directory backend error: {0}")]
    Backend(String),
}

/// Challenge issuance errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// The store already holds its maximum number of unexpired challenges
    #[error("{0} challenges outstanding")]
    Exhausted(usize),

    /// Expiry time is not representable
    #[error("challenge expiry out of range")]
    TimeOverflow,
}

impl From<DecodeError> for AuthError {
    fn from(err: DecodeError) -> Self {
        AuthError::InvalidArgument(err.to_string())
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(identity) => {
                AuthError::NotFound(format!("user {identity} not found"))
            }
            DirectoryError::Backend(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<ChallengeError> for AuthError {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::Exhausted(_) => {
                AuthError::ResourceExhausted("too many outstanding challenges".to_string())
            }
            ChallengeError::TimeOverflow => AuthError::Internal(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_hides_details() {
        let err = AuthError::Internal("connection refused at 10.0.0.5:5432".to_string());
        assert_eq!(err.code(), Code::Internal);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn test_decode_error_is_invalid_argument() {
        let err: AuthError = DecodeError::PublicKey("bad length".to_string()).into();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert!(err.public_message().contains("bad length"));
    }

    #[test]
    fn test_directory_error_mapping() {
        let not_found: AuthError = DirectoryError::NotFound("abc".to_string()).into();
        assert_eq!(not_found.code(), Code::NotFound);

        let backend: AuthError = DirectoryError::Backend("timeout".to_string()).into();
        assert_eq!(backend.code(), Code::Internal);
    }

    #[test]
    fn test_challenge_error_mapping() {
        let exhausted: AuthError = ChallengeError::Exhausted(10).into();
        assert_eq!(exhausted.code(), Code::ResourceExhausted);
        assert_eq!(exhausted.public_message(), "too many outstanding challenges");

        let overflow: AuthError = ChallengeError::TimeOverflow.into();
        assert_eq!(overflow.code(), Code::Internal);
        assert_eq!(overflow.public_message(), "internal error");
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(Code::InvalidArgument.as_str(), "invalid_argument");
        assert_eq!(Code::Unauthenticated.as_str(), "unauthenticated");
        assert_eq!(Code::NotFound.as_str(), "not_found");
        assert_eq!(Code::ResourceExhausted.as_str(), "resource_exhausted");
        assert_eq!(Code::Internal.as_str(), "internal");
    }
}
