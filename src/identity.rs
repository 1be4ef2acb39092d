//! Wallet identity: the canonical base58 form of an Ed25519 public key.

use crate::crypto::ed25519::decode_public_key;
use crate::error::DecodeError;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's identity, keyed by public key.
///
/// Always holds the canonical base58 encoding of a valid 32-byte Ed25519
/// key, so two equal identities always name the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse a base58 public key into its canonical identity.
    ///
    /// # Example
    /// ```rust
    /// use ed25519_dalek::SigningKey;
    /// use rand::rngs::OsRng;
    /// use shreddr_auth::Identity;
    ///
    /// let key = SigningKey::generate(&mut OsRng).verifying_key();
    /// let encoded = bs58::encode(key.as_bytes()).into_string();
    ///
    /// let id = Identity::parse(&encoded).unwrap();
    /// assert_eq!(id.as_str(), encoded);
    /// ```
    pub fn parse(public_key: &str) -> Result<Self, DecodeError> {
        let key = decode_public_key(public_key)?;
        Ok(Self::from_verifying_key(&key))
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(bs58::encode(key.as_bytes()).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back into a verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, DecodeError> {
        decode_public_key(&self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn test_canonical_form_matches_key() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        let id = Identity::from_verifying_key(&verifying_key);
        let parsed = Identity::parse(id.as_str()).unwrap();

        assert_eq!(parsed, id);
        assert_eq!(parsed.verifying_key().unwrap(), verifying_key);
    }

    #[test]
    fn test_distinct_keys_distinct_identities() {
        let a = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let b = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Identity::parse("not base58 0OIl"),
            Err(DecodeError::PublicKey(_))
        ));
        assert!(matches!(Identity::parse(""), Err(DecodeError::PublicKey(_))));
    }

    #[test]
    fn test_serde_as_string() {
        let id = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));

        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<Identity>("\"abc\"").is_err());
    }
}
