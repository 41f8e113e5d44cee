//! Nostr key handling.
//!
//! - Parses the secret key from NIP-19 `nsec` or raw hex
//! - Derives the secp256k1 keypair and x-only public key
//! - Produces and checks BIP-340 Schnorr signatures

use secp256k1::{schnorr::Signature, All, Keypair, Message, Secp256k1, XOnlyPublicKey};

use super::SigningError;

/// Length of a raw secret key in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// NIP-19 prefix of an encoded secret key.
const NSEC_PREFIX: &str = "nsec";

/// A secret key as configured, not yet checked against the curve.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SECRET_KEY_LENGTH]);

impl SecretKey {
    /// Parses `nsec1...` or 64 hex characters.
    pub fn parse(input: &str) -> Result<Self, KeyError> {
        let input = input.trim();

        let bytes = if input.to_ascii_lowercase().starts_with("nsec1") {
            let (hrp, data) =
                bech32::decode(input).map_err(|e| KeyError::Bech32(e.to_string()))?;
            if !hrp.as_str().eq_ignore_ascii_case(NSEC_PREFIX) {
                return Err(KeyError::WrongPrefix(hrp.to_string()));
            }
            data
        } else {
            hex::decode(input)?
        };

        let bytes: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;

        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SECRET_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives the keypair. Fails when the bytes are not a valid scalar.
    pub fn derive(&self) -> Result<Keys, SigningError> {
        let secp = Secp256k1::new();
        let keypair =
            Keypair::from_seckey_slice(&secp, &self.0).map_err(SigningError::KeyDerivation)?;
        let (public_key, _parity) = keypair.x_only_public_key();

        Ok(Keys {
            secp,
            keypair,
            public_key,
        })
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Derived signing keys.
pub struct Keys {
    secp: Secp256k1<All>,
    keypair: Keypair,
    public_key: XOnlyPublicKey,
}

impl Keys {
    /// Public key as lowercase hex (the Nostr `pubkey` field).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Signs a 32-byte digest.
    pub fn sign(&self, digest: [u8; 32]) -> Signature {
        let message = Message::from_digest(digest);
        self.secp.sign_schnorr(&message, &self.keypair)
    }
}

/// Verifies a hex signature over a digest against a hex x-only public key.
pub fn verify_signature(
    digest: [u8; 32],
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<(), SigningError> {
    let signature_bytes =
        hex::decode(signature_hex).map_err(|e| SigningError::Signature(e.to_string()))?;
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| SigningError::Signature(e.to_string()))?;

    let public_key_bytes =
        hex::decode(public_key_hex).map_err(|e| SigningError::Signature(e.to_string()))?;
    let public_key = XOnlyPublicKey::from_slice(&public_key_bytes)
        .map_err(|e| SigningError::Signature(e.to_string()))?;

    Secp256k1::verification_only()
        .verify_schnorr(&signature, &Message::from_digest(digest), &public_key)
        .map_err(|e| SigningError::Signature(e.to_string()))
}

/// Errors while parsing a configured secret key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid nsec encoding: {0}")]
    Bech32(String),

    #[error("expected an nsec key, got prefix {0:?}")]
    WrongPrefix(String),

    #[error("invalid hex key: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("secret key must be 32 bytes, got {0}")]
    InvalidLength(usize),
}
