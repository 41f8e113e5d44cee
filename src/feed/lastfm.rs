//! HTTP client for the Last.fm `user.getrecenttracks` method.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::{LastFmResponse, RecentTrack};
use super::{FeedError, NowPlayingSource};

/// Default Last.fm API root.
pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com";

/// Default timeout for HTTP requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent.
pub const DEFAULT_USER_AGENT: &str = concat!("lastfm-nostr-status/", env!("CARGO_PKG_VERSION"));

/// Last.fm API credentials.
#[derive(Clone)]
pub struct LastFmCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for LastFmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Last.fm HTTP client.
///
/// Only read-only, unsigned methods are used, so the API secret is never
/// sent.
#[derive(Debug, Clone)]
pub struct LastFmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    /// Creates a client against the public Last.fm API.
    pub fn new(credentials: &LastFmCredentials) -> Result<Self, FeedError> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Creates a client against another API root (used by tests).
    pub fn with_base_url(
        credentials: &LastFmCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        })
    }
}

#[async_trait]
impl NowPlayingSource for LastFmClient {
    async fn recent_track(&self, user: &str) -> Result<Option<RecentTrack>, FeedError> {
        let url = format!("{}/2.0/", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("method", "user.getrecenttracks"),
                ("user", user),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Last.fm reports API errors as a JSON body, sometimes with a 4xx status
        match serde_json::from_str::<LastFmResponse>(&body) {
            Ok(LastFmResponse::Error { error, message }) => Err(FeedError::Api {
                code: error,
                message,
            }),
            Ok(LastFmResponse::RecentTracks { recenttracks }) if status.is_success() => {
                Ok(recenttracks.track.into_first().map(RecentTrack::from))
            }
            Ok(LastFmResponse::RecentTracks { .. }) => Err(FeedError::Status(status)),
            Err(_) if !status.is_success() => Err(FeedError::Status(status)),
            Err(e) => Err(FeedError::Json(e)),
        }
    }
}
