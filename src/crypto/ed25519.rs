use crate::error::DecodeError;
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};

/// Decode a base58 wallet public key into an Ed25519 verifying key
///
/// # Arguments
/// * `public_key_b58` - Base58-encoded 32-byte public key
///
/// # Returns
/// * `Ok(VerifyingKey)` if the bytes are a valid curve point
/// * `Err(DecodeError::PublicKey)` on bad encoding, length, or point
pub fn decode_public_key(public_key_b58: &str) -> Result<VerifyingKey, DecodeError> {
    let bytes = bs58::decode(public_key_b58)
        .into_vec()
        .map_err(|e| DecodeError::PublicKey(format!("not base58: {}", e)))?;

    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        DecodeError::PublicKey(format!(
            "expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;

    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| DecodeError::PublicKey(format!("not an ed25519 point: {}", e)))
}

/// Decode a base58 signature into a 64-byte Ed25519 signature
pub fn decode_signature(signature_b58: &str) -> Result<Signature, DecodeError> {
    let bytes = bs58::decode(signature_b58)
        .into_vec()
        .map_err(|e| DecodeError::Signature(format!("not base58: {}", e)))?;

    let bytes: [u8; SIGNATURE_LENGTH] = bytes.as_slice().try_into().map_err(|_| {
        DecodeError::Signature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LENGTH,
            bytes.len()
        ))
    })?;

    Ok(Signature::from_bytes(&bytes))
}

/// Verify an Ed25519 signature over `message`
///
/// Returns `false` for any cryptographic failure; decoding happens before
/// this point and is reported separately.
pub fn verify_signature(public_key: &VerifyingKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature).is_ok()
}

/// Verify a wallet's proof of key ownership
///
/// The signed message is the wallet's own 32 public-key bytes. The message
/// is deterministic, so a captured (key, signature) pair can be replayed
/// indefinitely; use a challenge from [`crate::crypto::challenge`] when
/// replay matters.
pub fn verify_identity_signature(public_key: &VerifyingKey, signature: &Signature) -> bool {
    verify_signature(public_key, public_key.as_bytes(), signature)
}

/// Verify a signature with base58-encoded inputs (convenience function)
///
/// This is a wrapper around `verify_signature` that handles base58 decoding.
///
/// # Arguments
/// * `public_key_b58` - Base58-encoded public key
/// * `message` - Raw message bytes that were signed
/// * `signature_b58` - Base58-encoded signature
///
/// # Returns
/// * `Ok(true)` / `Ok(false)` for a valid / invalid signature
/// * `Err(DecodeError)` if either input cannot be decoded
pub fn verify_signature_b58(
    public_key_b58: &str,
    message: &[u8],
    signature_b58: &str,
) -> Result<bool, DecodeError> {
    let public_key = decode_public_key(public_key_b58)?;
    let signature = decode_signature(signature_b58)?;
    Ok(verify_signature(&public_key, message, &signature))
}

/// Base58 public key and signature, as a wallet submits them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedIdentity {
    pub public_key: String,
    pub signature: String,
}

/// Produce the client half of the legacy exchange: sign the wallet's own
/// public-key bytes.
///
/// # Example
/// ```rust
/// use ed25519_dalek::SigningKey;
/// use rand::rngs::OsRng;
/// use shreddr_auth::crypto::ed25519::{sign_identity, verify_signature_b58};
///
/// let wallet = SigningKey::generate(&mut OsRng);
/// let signed = sign_identity(&wallet);
///
/// let message = wallet.verifying_key().to_bytes();
/// assert!(verify_signature_b58(&signed.public_key, &message, &signed.signature).unwrap());
/// ```
pub fn sign_identity(signing_key: &SigningKey) -> SignedIdentity {
    let public_key = signing_key.verifying_key();
    let signature = signing_key.sign(public_key.as_bytes());
    SignedIdentity {
        public_key: bs58::encode(public_key.as_bytes()).into_string(),
        signature: bs58::encode(signature.to_bytes()).into_string(),
    }
}

/// Sign the raw bytes of a server-issued challenge.
pub fn sign_challenge(signing_key: &SigningKey, challenge: &[u8]) -> SignedIdentity {
    let signature = signing_key.sign(challenge);
    SignedIdentity {
        public_key: bs58::encode(signing_key.verifying_key().as_bytes()).into_string(),
        signature: bs58::encode(signature.to_bytes()).into_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn generate_wallet() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn test_verify_identity_signature() {
        let wallet = generate_wallet();
        let signed = sign_identity(&wallet);

        let key = decode_public_key(&signed.public_key).unwrap();
        let signature = decode_signature(&signed.signature).unwrap();

        assert!(verify_identity_signature(&key, &signature));
    }

    #[test]
    fn test_signature_from_other_wallet() {
        let wallet = generate_wallet();
        let other = generate_wallet();

        // other wallet signs the first wallet's key bytes
        let forged = other.sign(wallet.verifying_key().as_bytes());

        assert!(!verify_identity_signature(&wallet.verifying_key(), &forged));
    }

    #[test]
    fn test_signature_over_wrong_message() {
        let wallet = generate_wallet();
        let signature = wallet.sign(b"some other message");

        assert!(!verify_identity_signature(&wallet.verifying_key(), &signature));
        assert!(verify_signature(
            &wallet.verifying_key(),
            b"some other message",
            &signature
        ));
    }

    #[test]
    fn test_decode_public_key_errors() {
        // '0', 'O', 'I' and 'l' are outside the base58 alphabet
        assert!(matches!(
            decode_public_key("0OIl"),
            Err(DecodeError::PublicKey(_))
        ));

        let short = bs58::encode([7u8; 16]).into_string();
        let err = decode_public_key(&short).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 16"));
    }

    #[test]
    fn test_decode_signature_errors() {
        assert!(matches!(
            decode_signature("not-base58!"),
            Err(DecodeError::Signature(_))
        ));

        let short = bs58::encode([1u8; 63]).into_string();
        assert!(matches!(
            decode_signature(&short),
            Err(DecodeError::Signature(_))
        ));
    }

    #[test]
    fn test_verify_signature_b58_distinguishes_decode_from_invalid() {
        let wallet = generate_wallet();
        let signed = sign_identity(&wallet);

        let valid = verify_signature_b58(
            &signed.public_key,
            wallet.verifying_key().as_bytes(),
            &signed.signature,
        );
        assert_eq!(valid, Ok(true));

        let invalid = verify_signature_b58(&signed.public_key, b"tampered", &signed.signature);
        assert_eq!(invalid, Ok(false));

        let undecodable = verify_signature_b58(&signed.public_key, b"tampered", "###");
        assert!(matches!(undecodable, Err(DecodeError::Signature(_))));
    }

    #[test]
    fn test_sign_challenge() {
        let wallet = generate_wallet();
        let challenge = [42u8; 32];
        let signed = sign_challenge(&wallet, &challenge);

        assert_eq!(
            verify_signature_b58(&signed.public_key, &challenge, &signed.signature),
            Ok(true)
        );
    }
}
