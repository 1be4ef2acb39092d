pub mod challenge;
pub mod ed25519;
pub mod jwt;

// Re-export main functions for easier access
pub use ed25519::verify_signature;
