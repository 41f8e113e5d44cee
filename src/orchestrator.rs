//! One check-and-broadcast cycle.
//!
//! `FetchPrior -> FetchCurrent -> Decide -> Persist -> Sign -> Publish`.
//! The new status is persisted before anything is published, so a crash
//! between the two can miss a broadcast but never repeat one.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::database::SqliteStateStore;
use crate::error::RunError;
use crate::feed::{FeedReader, LastFmClient, NowPlayingSource};
use crate::nostr::{EventBuilder, SecretKey};
use crate::relay::{PublishReport, RelayConnector, RelayPublisher, WebSocketConnector};
use crate::retry::RetryPolicy;
use crate::status::{should_broadcast, Status};
use crate::store::{RetryingStore, StateStore};

/// How a successful run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The user is not playing anything.
    NothingPlaying,
    /// The current status was already broadcast.
    Unchanged(Status),
    /// The new status was persisted and fanned out.
    Broadcast {
        status: Status,
        report: PublishReport,
    },
}

/// Sequences the pipeline over its collaborators.
pub struct Orchestrator<S, F, C> {
    store: RetryingStore<S>,
    feed: FeedReader<F>,
    user: String,
    secret_key: SecretKey,
    publisher: RelayPublisher<C>,
}

impl Orchestrator<SqliteStateStore, LastFmClient, WebSocketConnector> {
    /// Wires the production collaborators from the configuration.
    pub fn from_config(config: &Config) -> Result<Self, RunError> {
        let store = SqliteStateStore::open(&config.database).map_err(RunError::OpenStore)?;
        let feed = LastFmClient::new(&config.lastfm).map_err(RunError::FeedClient)?;
        let publisher = RelayPublisher::new(
            WebSocketConnector,
            config.relays.clone(),
            config.relay_timeout,
        );

        Ok(Self::new(
            store,
            feed,
            config.lastfm_user.clone(),
            config.secret_key.clone(),
            publisher,
            RetryPolicy::default(),
        ))
    }
}

impl<S, F, C> Orchestrator<S, F, C>
where
    S: StateStore,
    F: NowPlayingSource,
    C: RelayConnector,
{
    pub fn new(
        store: S,
        feed: F,
        user: String,
        secret_key: SecretKey,
        publisher: RelayPublisher<C>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store: RetryingStore::new(store, retry),
            feed: FeedReader::new(feed, retry),
            user,
            secret_key,
            publisher,
        }
    }

    pub fn store(&self) -> &S {
        self.store.inner()
    }

    /// Runs one cycle, using `now` as the event time.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunOutcome, RunError> {
        tracing::debug!("Fetching last broadcast status");
        let last = self.store.load().await.map_err(RunError::FetchPrior)?;

        tracing::debug!(user = %self.user, "Fetching currently playing track");
        let current = self
            .feed
            .fetch_currently_playing(&self.user)
            .await
            .map_err(RunError::FetchCurrent)?;

        if !should_broadcast(&current, &last) {
            return Ok(if current.is_empty() {
                tracing::info!("Nothing playing, nothing to announce");
                RunOutcome::NothingPlaying
            } else {
                tracing::info!(status = %current, "Status unchanged");
                RunOutcome::Unchanged(current)
            });
        }

        tracing::info!(status = %current, previous = %last, "New status");

        self.store.save(&current).await.map_err(RunError::Persist)?;
        tracing::debug!("New status persisted");

        let builder = EventBuilder::new(&self.secret_key)?;
        let event = builder.build(&current, now)?;
        tracing::debug!(pubkey = %event.pubkey, id = %event.id, "Status event built");

        let report = self.publisher.publish(&event).await;

        Ok(RunOutcome::Broadcast {
            status: current,
            report,
        })
    }
}
