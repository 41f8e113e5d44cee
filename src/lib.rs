//! lastfm-nostr-status - Last.fm "now playing" to Nostr user status.
//!
//! One run reads the track a Last.fm user is currently playing, compares it
//! with the last status broadcast (kept in SQLite), and on change persists
//! the new status and publishes a signed, expiring NIP-38 status event to a
//! list of Nostr relays.

pub mod config;
pub mod database;
pub mod error;
pub mod feed;
pub mod nostr;
pub mod orchestrator;
pub mod relay;
pub mod retry;
pub mod status;
pub mod store;

pub use config::{Cli, Config};
pub use database::SqliteStateStore;
pub use error::RunError;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use status::{should_broadcast, Status};
