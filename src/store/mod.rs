//! Durable storage of the last broadcast status.
//!
//! The store holds one record, keyed by [`STATE_KEY`], with a single
//! `status` field. [`RetryingStore`] applies the retry policy on top of any
//! [`StateStore`] backend.

use crate::retry::{RetryError, RetryPolicy};
use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Fixed key of the persisted record.
pub const STATE_KEY: &str = "nostr-status-lastfm";

/// Shape of the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub status: String,
}

impl PersistedState {
    /// Decodes a stored value, failing if its shape is unexpected.
    ///
    /// Only a JSON object is accepted; serde would otherwise also take a
    /// one-element array for this struct.
    pub fn decode(raw: &str) -> Result<Self, StoreError> {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(raw).map_err(StoreError::Decode)?;
        serde_json::from_value(serde_json::Value::Object(object)).map_err(StoreError::Decode)
    }

    pub fn encode(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(StoreError::Encode)
    }
}

impl From<&Status> for PersistedState {
    fn from(status: &Status) -> Self {
        Self {
            status: status.as_str().to_string(),
        }
    }
}

/// Key-value backend for the persisted status.
pub trait StateStore: Send + Sync {
    /// Reads the status under `key`. An absent key yields an empty status.
    fn get(&self, key: &str) -> Result<Status, StoreError>;

    /// Writes `status` under `key`, creating the record if needed.
    fn set(&self, key: &str, status: &Status) -> Result<(), StoreError>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn get(&self, key: &str) -> Result<Status, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, status: &Status) -> Result<(), StoreError> {
        (**self).set(key, status)
    }
}

/// Errors from the state store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot create database directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("stored state has an unexpected shape: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether the failure may go away on its own (busy or locked database).
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// A [`StateStore`] with the retry policy applied to both operations.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: StateStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Loads the last broadcast status.
    pub async fn load(&self) -> Result<Status, RetryError<StoreError>> {
        let store = &self.inner;
        self.policy
            .run(
                "state get",
                || async move { store.get(STATE_KEY) },
                StoreError::is_transient,
            )
            .await
    }

    /// Persists `status` as the last broadcast status.
    pub async fn save(&self, status: &Status) -> Result<(), RetryError<StoreError>> {
        let store = &self.inner;
        self.policy
            .run(
                "state set",
                || async move { store.set(STATE_KEY, status) },
                StoreError::is_transient,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Store that reports "database busy" for the first `failures` calls.
    struct BusyStore {
        failures: u32,
        calls: AtomicU32,
        value: Mutex<Status>,
    }

    impl BusyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                value: Mutex::new(Status::from("A - B")),
            }
        }

        fn busy(&self) -> Result<(), StoreError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    None,
                )))
            } else {
                Ok(())
            }
        }
    }

    impl StateStore for BusyStore {
        fn get(&self, _key: &str) -> Result<Status, StoreError> {
            self.busy()?;
            Ok(self.value.lock().unwrap().clone())
        }

        fn set(&self, _key: &str, status: &Status) -> Result<(), StoreError> {
            self.busy()?;
            *self.value.lock().unwrap() = status.clone();
            Ok(())
        }
    }

    #[test]
    fn test_persisted_state_roundtrip_shape() {
        let state = PersistedState::from(&Status::from("A - B"));
        let raw = state.encode().unwrap();
        assert_eq!(raw, r#"{"status":"A - B"}"#);
        assert_eq!(PersistedState::decode(&raw).unwrap(), state);
    }

    #[test]
    fn test_unexpected_shape_is_decode_error() {
        assert!(matches!(
            PersistedState::decode(r#"{"status": 42}"#),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            PersistedState::decode(r#"["A - B"]"#),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_transient_classification() {
        let busy = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        let locked = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        ));
        let readonly = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_READONLY),
            None,
        ));
        assert!(busy.is_transient());
        assert!(locked.is_transient());
        assert!(!readonly.is_transient());
        assert!(!StoreError::Poisoned.is_transient());
    }

    #[tokio::test]
    async fn test_load_retries_busy_database() {
        let store = RetryingStore::new(BusyStore::new(2), RetryPolicy::immediate(3));
        let status = store.load().await.unwrap();
        assert_eq!(status, Status::from("A - B"));
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_save_gives_up_after_three_attempts() {
        let store = RetryingStore::new(BusyStore::new(10), RetryPolicy::immediate(3));
        let result = store.save(&Status::from("C - D")).await;
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(*store.inner().value.lock().unwrap(), Status::from("A - B"));
    }
}
