//! Now-playing feed.
//!
//! Provides:
//! - The [`NowPlayingSource`] seam and its Last.fm implementation
//! - [`FeedReader`], which applies the retry policy and turns the most
//!   recent play into a [`Status`]

pub mod lastfm;
pub mod types;

pub use lastfm::{LastFmClient, LastFmCredentials};
pub use types::RecentTrack;

use async_trait::async_trait;

use crate::retry::{RetryError, RetryPolicy};
use crate::status::Status;

/// A service that knows the most recent play of a user.
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    /// Most recent play of `user`, or `None` if the user has no plays.
    async fn recent_track(&self, user: &str) -> Result<Option<RecentTrack>, FeedError>;
}

/// Errors from the feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Last.fm error {code}: {message}")]
    Api { code: u32, message: String },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads the currently playing status, with retry.
pub struct FeedReader<F> {
    source: F,
    policy: RetryPolicy,
}

impl<F: NowPlayingSource> FeedReader<F> {
    pub fn new(source: F, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// Status of what `user` is playing right now.
    ///
    /// Empty if the most recent play is historical or there is none. Every
    /// feed failure is retried.
    pub async fn fetch_currently_playing(
        &self,
        user: &str,
    ) -> Result<Status, RetryError<FeedError>> {
        let source = &self.source;
        let track = self
            .policy
            .run(
                "feed fetch",
                || async move { source.recent_track(user).await },
                |_: &FeedError| true,
            )
            .await?;

        let status = track.map(|t| t.status()).unwrap_or_default();
        if status.is_empty() {
            tracing::debug!(user, "Nothing playing right now");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Source failing `failures` times before answering with `track`.
    struct ScriptedSource {
        failures: u32,
        calls: AtomicU32,
        track: Option<RecentTrack>,
    }

    impl ScriptedSource {
        fn new(failures: u32, track: Option<RecentTrack>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                track,
            }
        }
    }

    #[async_trait]
    impl NowPlayingSource for ScriptedSource {
        async fn recent_track(&self, _user: &str) -> Result<Option<RecentTrack>, FeedError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(FeedError::Api {
                    code: 16,
                    message: "temporarily unavailable".to_string(),
                });
            }
            Ok(self.track.clone())
        }
    }

    #[tokio::test]
    async fn test_now_playing_track_becomes_status() {
        let reader = FeedReader::new(
            ScriptedSource::new(0, Some(RecentTrack::new("A", "B", true))),
            RetryPolicy::immediate(3),
        );
        let status = reader.fetch_currently_playing("rj").await.unwrap();
        assert_eq!(status, Status::from("A - B"));
    }

    #[tokio::test]
    async fn test_historical_track_is_empty() {
        let reader = FeedReader::new(
            ScriptedSource::new(0, Some(RecentTrack::new("A", "B", false))),
            RetryPolicy::immediate(3),
        );
        assert!(reader.fetch_currently_playing("rj").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_plays_is_empty() {
        let reader = FeedReader::new(ScriptedSource::new(0, None), RetryPolicy::immediate(3));
        assert!(reader.fetch_currently_playing("rj").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let reader = FeedReader::new(
            ScriptedSource::new(2, Some(RecentTrack::new("A", "B", true))),
            RetryPolicy::default(),
        );
        let started = tokio::time::Instant::now();

        let status = reader.fetch_currently_playing("rj").await.unwrap();

        assert_eq!(status, Status::from("A - B"));
        assert_eq!(reader.source().calls.load(Ordering::SeqCst), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_three_failures_exhaust() {
        let reader = FeedReader::new(
            ScriptedSource::new(3, Some(RecentTrack::new("A", "B", true))),
            RetryPolicy::immediate(3),
        );
        let result = reader.fetch_currently_playing("rj").await;
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
    }
}
