//! # shreddr-auth
//!
//! Wallet-based authentication for the Shreddr ticketing backend. A user proves
//! control of an Ed25519 keypair (a Solana wallet) instead of a password, and
//! receives a signed **session JWT** that authorizes every later call.
//!
//! ## Features
//!
//! - **Ed25519 Signature Verification** - Base58 wallet keys and signatures
//! - **Stateless Sessions** - HS256 JWTs bound to the wallet identity, valid for 24 hours
//! - **Algorithm Pinning** - Tokens declaring any algorithm other than HS256 are rejected
//! - **User Directory** - Insert-if-absent record per wallet, pluggable backend
//! - **Optional Nonce Challenges** - Replay-resistant sign-in behind a flag
//! - **Connect-style RPC** - JSON over HTTP via axum
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ed25519_dalek::SigningKey;
//! use rand::rngs::OsRng;
//! use secrecy::Secret;
//! use shreddr_auth::{crypto::ed25519::sign_identity, AuthRequest, AuthService, JwtConfig, MemoryUserDirectory};
//!
//! let jwt_config = JwtConfig::new(Secret::new("your-secret-key".to_string()));
//! let auth_service = AuthService::new(jwt_config, Arc::new(MemoryUserDirectory::new()));
//!
//! // Wallet side: sign the public key bytes
//! let wallet = SigningKey::generate(&mut OsRng);
//! let signed = sign_identity(&wallet);
//!
//! let request = AuthRequest {
//!     public_key: signed.public_key,
//!     signature: signed.signature,
//!     challenge: None,
//! };
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! match runtime.block_on(auth_service.authenticate(request)) {
//!     Ok(response) => println!("JWT Token: {}", response.jwt),
//!     Err(e) => println!("Authentication failed: {}", e),
//! }
//! ```
//!
//! ## Replay
//!
//! By default the wallet signs its own public key, so a captured request can
//! be replayed. Enable [`AuthService::with_nonce_challenges`] (or
//! `AUTH_NONCE_CHALLENGES=true` for the server) to require a single-use
//! server challenge instead.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod identity;
pub mod rpc;

// Re-export main types for easier access
pub use auth::{AuthRequest, AuthResponse, AuthService, CreateUserRequest};
pub use config::{Config, JwtConfig};
pub use crypto::challenge::generate_challenge;
pub use crypto::ed25519::verify_signature;
pub use crypto::jwt::{create_jwt, validate_token};
pub use directory::{MemoryUserDirectory, UserDirectory, UserRecord};
pub use error::{AuthError, Result};
pub use identity::Identity;
