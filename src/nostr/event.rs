//! NIP-38 user status events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::keys::{verify_signature, Keys, SecretKey};
use super::SigningError;
use crate::status::Status;

/// Event kind of a NIP-38 user status.
pub const KIND_USER_STATUS: u16 = 30315;

/// Status slot (`d` tag) used for music.
pub const MUSIC_SLOT: &str = "music";

/// Lifetime of a status event, in seconds.
pub const STATUS_TTL_SECS: i64 = 300;

/// Prefix of the `r` reference tag.
pub const SEARCH_SCHEME: &str = "spotify:search:";

/// A signed status event, in the NIP-01 wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl StatusEvent {
    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }

    /// Unix time after which the event is stale.
    pub fn expiration(&self) -> Option<i64> {
        self.tag("expiration").and_then(|v| v.parse().ok())
    }

    /// Checks the id against the content and the signature against the id.
    pub fn verify(&self) -> Result<(), SigningError> {
        let digest = event_digest(
            &self.pubkey,
            self.created_at,
            self.kind,
            &self.tags,
            &self.content,
        )?;
        if hex::encode(digest) != self.id {
            return Err(SigningError::Signature("event id mismatch".to_string()));
        }
        verify_signature(digest, &self.sig, &self.pubkey)
    }
}

/// sha256 of the canonical `[0, pubkey, created_at, kind, tags, content]`.
pub fn event_digest(
    pubkey: &str,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> Result<[u8; 32], SigningError> {
    let canonical = serde_json::to_string(&serde_json::json!([
        0, pubkey, created_at, kind, tags, content
    ]))
    .map_err(SigningError::Serialize)?;

    Ok(Sha256::digest(canonical.as_bytes()).into())
}

/// `spotify:search:` reference to `content`, form-urlencoded.
pub fn search_reference(content: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(content.as_bytes()).collect();
    format!("{}{}", SEARCH_SCHEME, encoded)
}

/// Builds and signs status events with one key.
pub struct EventBuilder {
    keys: Keys,
}

impl EventBuilder {
    /// Derives the signing keys. An underivable key is a configuration
    /// problem and is not retried.
    pub fn new(secret: &SecretKey) -> Result<Self, SigningError> {
        Ok(Self {
            keys: secret.derive()?,
        })
    }

    /// Builds the signed status event for `content` at time `now`.
    pub fn build(&self, content: &Status, now: DateTime<Utc>) -> Result<StatusEvent, SigningError> {
        let created_at = now.timestamp();
        let pubkey = self.keys.public_key_hex();
        let tags = vec![
            vec!["d".to_string(), MUSIC_SLOT.to_string()],
            vec![
                "expiration".to_string(),
                (created_at + STATUS_TTL_SECS).to_string(),
            ],
            vec!["r".to_string(), search_reference(content.as_str())],
        ];

        let digest = event_digest(&pubkey, created_at, KIND_USER_STATUS, &tags, content.as_str())?;
        let sig = hex::encode(self.keys.sign(digest).serialize());

        let event = StatusEvent {
            id: hex::encode(digest),
            pubkey,
            created_at,
            kind: KIND_USER_STATUS,
            tags,
            content: content.as_str().to_string(),
            sig,
        };

        // Never hand out an event that does not verify
        event.verify()?;

        tracing::debug!(id = %event.id, "Status event signed");
        Ok(event)
    }
}
