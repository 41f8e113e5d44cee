//! Run-level errors.
//!
//! Every variant aborts the run with a non-zero exit code. Relay failures
//! are not represented here: they are logged and skipped.

use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::nostr::SigningError;
use crate::retry::RetryError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot open state store: {0}")]
    OpenStore(#[source] StoreError),

    #[error("cannot create feed client: {0}")]
    FeedClient(#[source] FeedError),

    #[error("cannot read last status: {0}")]
    FetchPrior(#[source] RetryError<StoreError>),

    #[error("cannot read currently playing track: {0}")]
    FetchCurrent(#[source] RetryError<FeedError>),

    #[error("cannot persist new status: {0}")]
    Persist(#[source] RetryError<StoreError>),

    #[error("cannot sign status event: {0}")]
    Signing(#[from] SigningError),
}
