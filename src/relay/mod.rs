//! Best-effort fan-out of a status event to Nostr relays.
//!
//! Each relay is attempted independently: a relay that cannot be reached,
//! refuses the event or hangs is logged and skipped. Publishing never fails
//! the run.

pub mod websocket;

pub use websocket::WebSocketConnector;

use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::timeout;

use crate::nostr::StatusEvent;

/// Relays used when none are configured.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay-jp.nostr.wirednet.jp",
    "wss://yabu.me",
    "wss://relay.damus.io",
    "wss://nostr.compile-error.net",
];

/// Default bound on each connect, publish and close step.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens connections to relays.
#[async_trait]
pub trait RelayConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn RelayConnection>, RelayError>;
}

/// An open relay connection, used for a single publish.
#[async_trait]
pub trait RelayConnection: Send {
    /// Sends the event and waits for the relay's verdict.
    async fn publish(&mut self, event: &StatusEvent) -> Result<(), RelayError>;

    /// Closes the connection. Errors are only logged.
    async fn close(&mut self);
}

/// Failure talking to one relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("event rejected: {0}")]
    Rejected(String),

    #[error("connection closed before acknowledgement")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Step of a relay attempt that ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Publish,
}

/// What happened at one relay.
#[derive(Debug)]
pub enum RelayOutcome {
    Published,
    ConnectFailed(RelayError),
    PublishFailed(RelayError),
    TimedOut(Stage),
}

impl RelayOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RelayOutcome::Published)
    }
}

/// Outcome for one endpoint.
#[derive(Debug)]
pub struct RelayResult {
    pub relay: String,
    pub outcome: RelayOutcome,
}

/// Per-endpoint outcomes, in endpoint order.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub results: Vec<RelayResult>,
}

impl PublishReport {
    pub fn published(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_published())
            .count()
    }

    pub fn attempted(&self) -> usize {
        self.results.len()
    }
}

/// Publishes events to a fixed, ordered list of relays.
pub struct RelayPublisher<C> {
    connector: C,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl<C: RelayConnector> RelayPublisher<C> {
    pub fn new(connector: C, endpoints: Vec<String>, timeout: Duration) -> Self {
        Self {
            connector,
            endpoints,
            timeout,
        }
    }

    /// Attempts every endpoint concurrently and waits for all of them.
    pub async fn publish(&self, event: &StatusEvent) -> PublishReport {
        let attempts = self
            .endpoints
            .iter()
            .map(|relay| self.publish_one(relay, event));
        let outcomes = join_all(attempts).await;

        let report = PublishReport {
            results: self
                .endpoints
                .iter()
                .cloned()
                .zip(outcomes)
                .map(|(relay, outcome)| RelayResult { relay, outcome })
                .collect(),
        };

        tracing::info!(
            published = report.published(),
            attempted = report.attempted(),
            "Status event fan-out finished"
        );
        report
    }

    async fn publish_one(&self, relay: &str, event: &StatusEvent) -> RelayOutcome {
        let mut conn = match timeout(self.timeout, self.connector.connect(relay)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::warn!(relay, error = %e, "Failed to connect to relay");
                return RelayOutcome::ConnectFailed(e);
            }
            Err(_) => {
                tracing::warn!(relay, "Timed out connecting to relay");
                return RelayOutcome::TimedOut(Stage::Connect);
            }
        };

        let outcome = match timeout(self.timeout, conn.publish(event)).await {
            Ok(Ok(())) => {
                tracing::info!(relay, "Published status");
                RelayOutcome::Published
            }
            Ok(Err(e)) => {
                tracing::warn!(relay, error = %e, "Failed to publish to relay");
                RelayOutcome::PublishFailed(e)
            }
            Err(_) => {
                tracing::warn!(relay, "Timed out publishing to relay");
                RelayOutcome::TimedOut(Stage::Publish)
            }
        };

        if timeout(self.timeout, conn.close()).await.is_err() {
            tracing::debug!(relay, "Timed out closing relay connection");
        }

        outcome
    }
}
