//! Command-line and environment configuration.
//!
//! Every setting can be given as a flag or through its environment
//! variable. Values are collected as options and validated into a
//! [`Config`] before anything touches the database or the network.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::feed::LastFmCredentials;
use crate::nostr::{KeyError, SecretKey};
use crate::relay::{DEFAULT_RELAYS, DEFAULT_RELAY_TIMEOUT};

/// Raw command line.
#[derive(Debug, Default, Parser)]
#[command(
    name = "lastfm-nostr-status",
    about = "Publishes the Last.fm track you are playing as a Nostr user status"
)]
pub struct Cli {
    /// Last.fm API key
    #[arg(long, env = "LASTFM_API_KEY", hide_env_values = true)]
    pub lastfm_api_key: Option<String>,

    /// Last.fm API secret
    #[arg(long, env = "LASTFM_API_SECRET", hide_env_values = true)]
    pub lastfm_api_secret: Option<String>,

    /// Last.fm user to follow
    #[arg(long, env = "LASTFM_USER")]
    pub lastfm_user: Option<String>,

    /// SQLite database holding the last broadcast status
    #[arg(long, env = "STATUS_DATABASE")]
    pub database: Option<PathBuf>,

    /// Nostr secret key (nsec or hex)
    #[arg(long, env = "BOT_NSEC", hide_env_values = true)]
    pub nsec: Option<String>,

    /// Relay to publish to (repeatable)
    #[arg(long = "relay", env = "STATUS_RELAYS", value_delimiter = ',')]
    pub relays: Vec<String>,

    /// Timeout of each relay connect and publish, in seconds
    #[arg(long)]
    pub relay_timeout_secs: Option<u64>,

    /// Show version
    #[arg(short = 'v', long = "version")]
    pub show_version: bool,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub lastfm: LastFmCredentials,
    pub lastfm_user: String,
    pub database: PathBuf,
    pub secret_key: SecretKey,
    pub relays: Vec<String>,
    pub relay_timeout: Duration,
}

/// Missing or malformed setting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("BOT_NSEC is not a valid secret key: {0}")]
    InvalidSecretKey(#[from] KeyError),
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl Cli {
    /// Validates the raw options.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let api_key = required(self.lastfm_api_key, "LASTFM_API_KEY")?;
        let api_secret = required(self.lastfm_api_secret, "LASTFM_API_SECRET")?;
        let lastfm_user = required(self.lastfm_user, "LASTFM_USER")?;
        let database = self
            .database
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::Missing("STATUS_DATABASE"))?;
        let secret_key = SecretKey::parse(&required(self.nsec, "BOT_NSEC")?)?;

        let relays: Vec<String> = self
            .relays
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        let relays = if relays.is_empty() {
            DEFAULT_RELAYS.iter().map(|r| r.to_string()).collect()
        } else {
            relays
        };

        let relay_timeout = self
            .relay_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RELAY_TIMEOUT);

        Ok(Config {
            lastfm: LastFmCredentials {
                api_key,
                api_secret,
            },
            lastfm_user,
            database,
            secret_key,
            relays,
            relay_timeout,
        })
    }
}
