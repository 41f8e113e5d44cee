//! Nostr signing for status events.
//!
//! Provides:
//! - Secret key parsing (`nsec` or hex) and secp256k1 key derivation
//! - NIP-01 event ids and BIP-340 signatures
//! - The NIP-38 status event builder

pub mod event;
pub mod keys;

pub use event::{EventBuilder, StatusEvent};
pub use keys::{KeyError, Keys, SecretKey};

/// Key derivation or signature failure. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("cannot derive a public key from the secret key: {0}")]
    KeyDerivation(#[source] secp256k1::Error),

    #[error("signature error: {0}")]
    Signature(String),

    #[error("failed to serialize event: {0}")]
    Serialize(#[source] serde_json::Error),
}
