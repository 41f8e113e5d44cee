//! The broadcast status string and the change gate.

use std::fmt;

/// What is currently playing, as `"<artist> - <track>"`.
///
/// An empty status means nothing is playing and is never broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Status(String);

impl Status {
    /// The "nothing playing" status.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Builds the status line for a track.
    pub fn from_track(artist: &str, track: &str) -> Self {
        Self(format!("{} - {}", artist, track))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Decides whether `current` should be broadcast given the `last` one.
///
/// Exact string comparison, no normalization.
pub fn should_broadcast(current: &Status, last: &Status) -> bool {
    !current.is_empty() && current != last
}
