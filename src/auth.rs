use crate::{
    config::JwtConfig,
    crypto::{
        challenge::{decode_challenge, Challenge, ChallengeStore},
        ed25519::{decode_public_key, decode_signature, verify_identity_signature, verify_signature},
        jwt::{create_jwt, validate_token},
    },
    directory::{UserDirectory, UserRecord},
    error::{AuthError, Result},
    identity::Identity,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Authentication service for wallet signature sign-in
///
/// This service handles the whole authentication exchange:
/// - Decoding and verifying the wallet's signature
/// - Recording the wallet in the user directory
/// - Issuing a session JWT
/// - Validating that JWT on every protected call
///
/// Sessions are stateless: the token alone proves the session. The only
/// server-side state is the optional set of outstanding nonce challenges.
pub struct AuthService {
    pub jwt_config: JwtConfig,
    directory: Arc<dyn UserDirectory>,
    challenges: Option<ChallengeStore>,
}

/// Request structure for authenticating with a wallet signature
///
/// - `public_key`: base58 wallet public key
/// - `signature`: base58 signature over the public key bytes, or over the
///   challenge bytes when nonce challenges are enabled
/// - `challenge`: the server-issued challenge (nonce mode only)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub public_key: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

/// Request to register a wallet without signing in
///
/// `address` is the base58 wallet public key; the proof is the same as for
/// [`AuthRequest`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub address: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
}

/// Response structure containing the session token
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub jwt: String,
    pub session_id: Uuid,
    pub expires_at: i64,
}

impl AuthService {
    /// Create a new authentication service
    ///
    /// # Arguments
    /// * `jwt_config` - Server secret and token lifetime
    /// * `directory` - User directory used to record wallets
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use secrecy::Secret;
    /// use shreddr_auth::{AuthService, JwtConfig, MemoryUserDirectory};
    ///
    /// let config = JwtConfig::new(Secret::new("your-secret".to_string()));
    /// let auth_service = AuthService::new(config, Arc::new(MemoryUserDirectory::new()));
    /// ```
    pub fn new(jwt_config: JwtConfig, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            jwt_config,
            directory,
            challenges: None,
        }
    }

    /// Require a server-issued, single-use challenge for every sign-in
    ///
    /// Without this the wallet signs its own public key, which a captured
    /// request can replay forever. Enabling it changes the wire protocol:
    /// clients must call [`issue_challenge`](Self::issue_challenge) first.
    pub fn with_nonce_challenges(self, ttl_secs: i64) -> Self {
        self.with_challenge_store(ChallengeStore::new(ttl_secs))
    }

    /// Enable nonce challenges backed by a preconfigured store
    pub fn with_challenge_store(mut self, store: ChallengeStore) -> Self {
        self.challenges = Some(store);
        self
    }

    pub fn nonce_challenges_enabled(&self) -> bool {
        self.challenges.is_some()
    }

    /// Issue a challenge for the client to sign
    ///
    /// # Errors
    /// - `InvalidArgument` - Nonce challenges are not enabled
    /// - `ResourceExhausted` - Too many challenges are outstanding
    pub fn issue_challenge(&self) -> Result<Challenge> {
        let store = self.challenges.as_ref().ok_or_else(|| {
            AuthError::InvalidArgument("nonce challenges are not enabled".to_string())
        })?;
        store.issue(Utc::now()).map_err(|e| {
            tracing::warn!(error = %e, "challenge not issued");
            AuthError::from(e)
        })
    }

    /// Authenticate a wallet by verifying its signature
    ///
    /// This is the core authentication method that:
    /// 1. Decodes the base58 public key and signature
    /// 2. Verifies the signature (over the key bytes, or the challenge)
    /// 3. Records the wallet in the user directory if it is new
    /// 4. Creates and returns a JWT for the wallet
    ///
    /// Nothing is written to the directory unless the signature verifies.
    ///
    /// # Errors
    /// - `InvalidArgument` - Public key, signature, or challenge cannot be decoded
    /// - `Unauthenticated` - Signature verification failed or challenge is not outstanding
    /// - `Internal` - Directory or token signing failure
    ///
    /// # Example
    /// ```rust
    /// use std::sync::Arc;
    /// use ed25519_dalek::SigningKey;
    /// use rand::rngs::OsRng;
    /// use secrecy::Secret;
    /// use shreddr_auth::{crypto::ed25519::sign_identity, AuthRequest, AuthService, JwtConfig, MemoryUserDirectory};
    ///
    /// let runtime = tokio::runtime::Runtime::new().unwrap();
    /// let config = JwtConfig::new(Secret::new("your-secret".to_string()));
    /// let auth_service = AuthService::new(config, Arc::new(MemoryUserDirectory::new()));
    ///
    /// let wallet = SigningKey::generate(&mut OsRng);
    /// let signed = sign_identity(&wallet);
    /// let request = AuthRequest {
    ///     public_key: signed.public_key.clone(),
    ///     signature: signed.signature,
    ///     challenge: None,
    /// };
    ///
    /// let response = runtime.block_on(auth_service.authenticate(request)).unwrap();
    /// let identity = auth_service.authorize(&response.jwt).unwrap();
    /// assert_eq!(identity.as_str(), signed.public_key);
    /// ```
    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthResponse> {
        let identity = self.verify_wallet(
            &request.public_key,
            &request.signature,
            request.challenge.as_deref(),
        )?;
        let user = self.record(&identity).await?;

        let issued = create_jwt(&identity, &self.jwt_config).map_err(|e| {
            tracing::error!(identity = %identity, error = %e, "failed to issue session token");
            AuthError::Internal(e.to_string())
        })?;

        tracing::info!(
            identity = %identity,
            user_id = user.id,
            session_id = %issued.session_id,
            "wallet authenticated"
        );

        Ok(AuthResponse {
            jwt: issued.token,
            session_id: issued.session_id,
            expires_at: issued.expires_at,
        })
    }

    /// Register a wallet without starting a session
    ///
    /// Same proof as [`authenticate`](Self::authenticate), but no token is
    /// minted. Registering an existing wallet returns its record unchanged.
    ///
    /// # Errors
    /// - `InvalidArgument` - Address, signature, or challenge cannot be decoded
    /// - `Unauthenticated` - Signature verification failed or challenge is not outstanding
    /// - `Internal` - Directory failure
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserRecord> {
        let identity = self.verify_wallet(
            &request.address,
            &request.signature,
            request.challenge.as_deref(),
        )?;
        let user = self.record(&identity).await?;
        tracing::info!(identity = %identity, user_id = user.id, "wallet registered");
        Ok(user)
    }

    /// Resolve a session token to the wallet identity it was issued for
    ///
    /// Every protected call goes through here. Any validation failure is
    /// reported as the same `Unauthenticated` error; the specific cause is
    /// only logged.
    ///
    /// # Errors
    /// - `Unauthenticated` - Token is missing, malformed, forged, or expired
    pub fn authorize(&self, token: &str) -> Result<Identity> {
        let rejected = || AuthError::Unauthenticated("invalid or expired token".to_string());

        if token.trim().is_empty() {
            return Err(rejected());
        }

        let claims = validate_token(token, &self.jwt_config).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            rejected()
        })?;

        Identity::parse(&claims.sub).map_err(|e| {
            tracing::debug!(error = %e, "session token subject is not a wallet identity");
            rejected()
        })
    }

    /// Fetch the user behind a session token
    ///
    /// # Errors
    /// - `Unauthenticated` - Token rejected by [`authorize`](Self::authorize)
    /// - `NotFound` - The wallet has no directory record
    /// - `Internal` - Directory failure
    pub async fn get_user(&self, token: &str) -> Result<UserRecord> {
        let identity = self.authorize(token)?;
        self.lookup(identity.as_str()).await
    }

    /// Fetch a user by wallet address (unauthenticated lookup)
    ///
    /// # Errors
    /// - `InvalidArgument` - Address is not a base58 public key
    /// - `NotFound` - The wallet has no directory record
    /// - `Internal` - Directory failure
    pub async fn get_user_by_wallet(&self, wallet_address: &str) -> Result<UserRecord> {
        let identity = Identity::parse(wallet_address)?;
        self.lookup(identity.as_str()).await
    }

    /// Drop expired challenges; returns how many were removed
    pub fn purge_expired_challenges(&self) -> usize {
        self.challenges
            .as_ref()
            .map_or(0, |store| store.purge_expired(Utc::now()))
    }

    /// Decode the wallet's key and signature and check the proof of control
    ///
    /// The signed message is the key's own bytes, or the challenge bytes in
    /// nonce mode. A challenge is consumed only once its signature verifies.
    fn verify_wallet(
        &self,
        public_key: &str,
        signature: &str,
        challenge: Option<&str>,
    ) -> Result<Identity> {
        let public_key = decode_public_key(public_key)?;
        let signature = decode_signature(signature)?;
        let identity = Identity::from_verifying_key(&public_key);
        let rejected = || AuthError::Unauthenticated("invalid signature".to_string());

        match &self.challenges {
            None => {
                if !verify_identity_signature(&public_key, &signature) {
                    tracing::warn!(identity = %identity, "invalid signature");
                    return Err(rejected());
                }
            }
            Some(store) => {
                let challenge = challenge.ok_or_else(|| {
                    AuthError::InvalidArgument("challenge is required".to_string())
                })?;
                let message = decode_challenge(challenge)?;

                if !verify_signature(&public_key, &message, &signature) {
                    tracing::warn!(identity = %identity, "invalid signature over challenge");
                    return Err(rejected());
                }
                if !store.consume(challenge, Utc::now()) {
                    tracing::warn!(identity = %identity, "challenge unknown, expired, or reused");
                    return Err(rejected());
                }
            }
        }

        Ok(identity)
    }

    /// Insert-if-absent; nothing reaches here before the signature verifies
    async fn record(&self, identity: &Identity) -> Result<UserRecord> {
        self.directory.insert_if_absent(identity).await.map_err(|e| {
            tracing::error!(identity = %identity, error = %e, "failed to record user");
            AuthError::Internal(format!("failed to record user: {}", e))
        })
    }

    async fn lookup(&self, identity: &str) -> Result<UserRecord> {
        self.directory.get_by_identity(identity).await.map_err(|e| {
            let err = AuthError::from(e);
            if let AuthError::Internal(msg) = &err {
                tracing::error!(identity = %identity, error = %msg, "user lookup failed");
            }
            err
        })
    }
}
