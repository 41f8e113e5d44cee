//! Track information returned by the Last.fm feed.

use serde::Deserialize;

use crate::status::Status;

/// The most recent play of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTrack {
    /// Artist name.
    pub artist: String,

    /// Track title.
    pub name: String,

    /// Whether Last.fm flags this play as "now playing" (not historical).
    pub now_playing: bool,
}

impl RecentTrack {
    pub fn new(artist: impl Into<String>, name: impl Into<String>, now_playing: bool) -> Self {
        Self {
            artist: artist.into(),
            name: name.into(),
            now_playing,
        }
    }

    /// Returns true if this represents actual playing media.
    pub fn is_playing(&self) -> bool {
        self.now_playing && !self.name.is_empty()
    }

    /// Status line for this track, empty unless it is playing right now.
    pub fn status(&self) -> Status {
        if self.is_playing() {
            Status::from_track(&self.artist, &self.name)
        } else {
            Status::empty()
        }
    }
}

// === Wire format of user.getrecenttracks (format=json) ===

/// Top-level body: either the payload or a Last.fm error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum LastFmResponse {
    Error { error: u32, message: String },
    RecentTracks { recenttracks: RecentTracksPayload },
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecentTracksPayload {
    #[serde(default)]
    pub track: OneOrMany<TrackEntry>,
}

/// Last.fm returns a bare object instead of an array for a single track.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackEntry {
    pub artist: TextField,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "@attr", default)]
    pub attr: Option<TrackAttr>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextField {
    #[serde(rename = "#text", default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackAttr {
    #[serde(default)]
    pub nowplaying: Option<String>,
}

impl From<TrackEntry> for RecentTrack {
    fn from(entry: TrackEntry) -> Self {
        let now_playing = entry
            .attr
            .and_then(|a| a.nowplaying)
            .is_some_and(|v| v == "true");
        RecentTrack::new(entry.artist.text, entry.name, now_playing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_of_playing_track() {
        let track = RecentTrack::new("Radiohead", "Airbag", true);
        assert_eq!(track.status(), Status::from("Radiohead - Airbag"));
    }

    #[test]
    fn test_historical_track_has_empty_status() {
        let track = RecentTrack::new("Radiohead", "Airbag", false);
        assert!(track.status().is_empty());
    }

    #[test]
    fn test_parse_track_array() {
        let body = r##"{"recenttracks":{"track":[
            {"artist":{"mbid":"","#text":"Radiohead"},"name":"Airbag","@attr":{"nowplaying":"true"}},
            {"artist":{"mbid":"","#text":"Portishead"},"name":"Roads","date":{"uts":"1700000000"}}
        ],"@attr":{"user":"rj"}}}"##;

        let parsed: LastFmResponse = serde_json::from_str(body).unwrap();
        let LastFmResponse::RecentTracks { recenttracks } = parsed else {
            panic!("expected tracks");
        };
        let first: RecentTrack = recenttracks.track.into_first().unwrap().into();
        assert_eq!(first, RecentTrack::new("Radiohead", "Airbag", true));
    }

    #[test]
    fn test_parse_single_track_object() {
        let body = r##"{"recenttracks":{"track":
            {"artist":{"#text":"Portishead"},"name":"Roads","date":{"uts":"1700000000"}}
        }}"##;

        let parsed: LastFmResponse = serde_json::from_str(body).unwrap();
        let LastFmResponse::RecentTracks { recenttracks } = parsed else {
            panic!("expected tracks");
        };
        let first: RecentTrack = recenttracks.track.into_first().unwrap().into();
        assert!(!first.now_playing);
    }

    #[test]
    fn test_parse_error_body() {
        let parsed: LastFmResponse =
            serde_json::from_str(r#"{"error":6,"message":"User not found"}"#).unwrap();
        assert!(matches!(parsed, LastFmResponse::Error { error: 6, .. }));
    }
}
