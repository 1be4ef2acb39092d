use crate::error::{ChallengeError, DecodeError};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;

pub const CHALLENGE_LENGTH: usize = 32;

/// Longest lifetime a challenge may be given: one day
pub const MAX_CHALLENGE_TTL_SECS: i64 = 86_400;

/// Default bound on unexpired, unconsumed challenges held at once
pub const DEFAULT_MAX_OUTSTANDING_CHALLENGES: usize = 100_000;

/// Generate a cryptographically secure random challenge
///
/// Returns 32 random bytes as a base58 encoded string
///
/// # Example
/// ```rust
/// use shreddr_auth::crypto::challenge::generate_challenge;
///
/// let challenge = generate_challenge();
/// println!("Challenge: {}", challenge);
/// ```
pub fn generate_challenge() -> String {
    let mut rng = rand::thread_rng();
    let challenge_bytes: [u8; CHALLENGE_LENGTH] = rng.r#gen();
    bs58::encode(challenge_bytes).into_string()
}

/// Decode a base58 challenge string to the bytes the wallet signs
///
/// # Example
/// ```rust
/// use shreddr_auth::crypto::challenge::{generate_challenge, decode_challenge};
///
/// let challenge = generate_challenge();
/// let challenge_bytes = decode_challenge(&challenge).unwrap();
/// assert_eq!(challenge_bytes.len(), 32);
/// ```
pub fn decode_challenge(challenge_b58: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = bs58::decode(challenge_b58)
        .into_vec()
        .map_err(|e| DecodeError::Challenge(format!("not base58: {}", e)))?;
    if bytes.len() != CHALLENGE_LENGTH {
        return Err(DecodeError::Challenge(format!(
            "expected {} bytes, got {}",
            CHALLENGE_LENGTH,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// A challenge handed to a client
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub challenge: String,
    pub expires_at: i64,
}

/// Outstanding single-use challenges
///
/// Each challenge can be consumed at most once and only before it expires.
/// Issuing is unauthenticated, so the store holds at most `capacity`
/// entries. When full, expired entries are purged first and issuing fails
/// only if the store is still full.
pub struct ChallengeStore {
    outstanding: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
    capacity: usize,
}

impl ChallengeStore {
    /// Store with the default capacity.
    ///
    /// `ttl_secs` is clamped to `1..=MAX_CHALLENGE_TTL_SECS`.
    pub fn new(ttl_secs: i64) -> Self {
        Self::with_capacity(ttl_secs, DEFAULT_MAX_OUTSTANDING_CHALLENGES)
    }

    pub fn with_capacity(ttl_secs: i64, capacity: usize) -> Self {
        Self {
            outstanding: DashMap::new(),
            ttl: Duration::seconds(ttl_secs.clamp(1, MAX_CHALLENGE_TTL_SECS)),
            capacity,
        }
    }

    /// Issue a fresh challenge expiring `ttl` after `now`.
    ///
    /// The capacity check is not atomic with the insert, so concurrent
    /// issuers may overshoot the bound by at most their own number.
    pub fn issue(&self, now: DateTime<Utc>) -> Result<Challenge, ChallengeError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(ChallengeError::TimeOverflow)?;

        if self.outstanding.len() >= self.capacity {
            self.purge_expired(now);
            let outstanding = self.outstanding.len();
            if outstanding >= self.capacity {
                return Err(ChallengeError::Exhausted(outstanding));
            }
        }

        let challenge = generate_challenge();
        self.outstanding.insert(challenge.clone(), expires_at);
        Ok(Challenge {
            challenge,
            expires_at: expires_at.timestamp(),
        })
    }

    /// Remove `challenge` and report whether it was outstanding and unexpired.
    pub fn consume(&self, challenge: &str, now: DateTime<Utc>) -> bool {
        match self.outstanding.remove(challenge) {
            Some((_, expires_at)) => now < expires_at,
            None => false,
        }
    }

    /// Drop expired challenges, returning how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.outstanding.len();
        self.outstanding.retain(|_, expires_at| now < *expires_at);
        before.saturating_sub(self.outstanding.len())
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_challenge() {
        let challenge1 = generate_challenge();
        let challenge2 = generate_challenge();

        // Should be different
        assert_ne!(challenge1, challenge2);

        // Should be base58 encoded 32 bytes
        let decoded = bs58::decode(&challenge1).into_vec().unwrap();
        assert_eq!(decoded.len(), 32);
    }

    #[test]
    fn test_decode_challenge() {
        let challenge = generate_challenge();
        let decoded = decode_challenge(&challenge).unwrap();

        assert_eq!(decoded.len(), 32);
        assert_eq!(bs58::encode(&decoded).into_string(), challenge);
    }

    #[test]
    fn test_decode_invalid_challenge() {
        assert!(matches!(
            decode_challenge("invalid-base58!"),
            Err(DecodeError::Challenge(_))
        ));

        let short = bs58::encode([9u8; 8]).into_string();
        assert!(matches!(
            decode_challenge(&short),
            Err(DecodeError::Challenge(_))
        ));
    }

    #[test]
    fn test_challenge_is_single_use() {
        let store = ChallengeStore::new(60);
        let now = Utc::now();
        let issued = store.issue(now).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.consume(&issued.challenge, now));
        assert!(!store.consume(&issued.challenge, now));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_challenge_rejected() {
        let store = ChallengeStore::new(60);
        assert!(!store.consume(&generate_challenge(), Utc::now()));
    }

    #[test]
    fn test_expired_challenge_rejected() {
        let store = ChallengeStore::new(60);
        let now = Utc::now();
        let issued = store.issue(now).unwrap();

        assert_eq!(issued.expires_at, (now + Duration::seconds(60)).timestamp());
        assert!(!store.consume(&issued.challenge, now + Duration::seconds(60)));
        // expired entries are still removed on consume
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let store = ChallengeStore::new(60);
        let now = Utc::now();
        store.issue(now - Duration::seconds(120)).unwrap();
        store.issue(now - Duration::seconds(90)).unwrap();
        let fresh = store.issue(now).unwrap();

        assert_eq!(store.purge_expired(now), 2);
        assert_eq!(store.len(), 1);
        assert!(store.consume(&fresh.challenge, now));
    }

    #[test]
    fn test_ttl_is_clamped() {
        let now = Utc::now();

        let store = ChallengeStore::new(100_000_000_000_000);
        let issued = store.issue(now).unwrap();
        assert_eq!(
            issued.expires_at,
            (now + Duration::seconds(MAX_CHALLENGE_TTL_SECS)).timestamp()
        );

        let store = ChallengeStore::new(i64::MAX);
        assert!(store.issue(now).is_ok());

        let store = ChallengeStore::new(0);
        let issued = store.issue(now).unwrap();
        assert_eq!(issued.expires_at, (now + Duration::seconds(1)).timestamp());
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let store = ChallengeStore::new(60);
        assert_eq!(
            store.issue(DateTime::<Utc>::MAX_UTC).unwrap_err(),
            ChallengeError::TimeOverflow
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_capacity_limits_outstanding() {
        let store = ChallengeStore::with_capacity(60, 2);
        let now = Utc::now();
        let first = store.issue(now).unwrap();
        store.issue(now).unwrap();

        assert_eq!(
            store.issue(now).unwrap_err(),
            ChallengeError::Exhausted(2)
        );
        assert_eq!(store.len(), 2);

        // consuming frees a slot
        assert!(store.consume(&first.challenge, now));
        assert!(store.issue(now).is_ok());
    }

    #[test]
    fn test_full_store_purges_expired_before_rejecting() {
        let store = ChallengeStore::with_capacity(60, 2);
        let now = Utc::now();
        store.issue(now - Duration::seconds(120)).unwrap();
        store.issue(now).unwrap();

        let issued = store.issue(now).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.consume(&issued.challenge, now));
    }
}
