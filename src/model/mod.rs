//! Core data models for a fetched playlist.
//!
//! Defines the primary entities: [`Playlist`], [`Track`] and [`ArtworkSet`].
//! These are OUR types; API responses are converted into them by
//! [`crate::audius`]'s adapter and never leak past it.
//!
//! Everything here is immutable once fetched and lives for as long as the
//! command that fetched it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three fixed artwork resolutions the API publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ArtworkSize {
    /// 150x150 thumbnail (track rows)
    #[default]
    #[serde(rename = "150x150")]
    Small,
    /// 480x480 (playlist header)
    #[serde(rename = "480x480")]
    Medium,
    /// 1000x1000
    #[serde(rename = "1000x1000")]
    Large,
}

impl ArtworkSize {
    /// All sizes, smallest first.
    pub const ALL: [ArtworkSize; 3] = [Self::Small, Self::Medium, Self::Large];

    /// The tag used by the API for this size.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "150x150",
            Self::Medium => "480x480",
            Self::Large => "1000x1000",
        }
    }
}

impl fmt::Display for ArtworkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtworkSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| format!("unknown artwork size '{s}' (expected 150x150, 480x480 or 1000x1000)"))
    }
}

/// Artwork URLs for a track or playlist.
///
/// Mirrors are alternate origins serving the same image at the same path.
/// Attempt index 0 always means the primary URL, index `i` means
/// `mirrors[i - 1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtworkSet {
    primary: BTreeMap<ArtworkSize, String>,
    mirrors: Vec<String>,
}

impl ArtworkSet {
    /// Create an artwork set from primary URLs and mirror hosts.
    pub fn new(
        primary: impl IntoIterator<Item = (ArtworkSize, String)>,
        mirrors: Vec<String>,
    ) -> Self {
        Self {
            primary: primary.into_iter().collect(),
            mirrors,
        }
    }

    /// Primary URL for a size, if the API published one.
    pub fn primary(&self, size: ArtworkSize) -> Option<&str> {
        self.primary.get(&size).map(String::as_str)
    }

    /// Ordered mirror hosts.
    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Whether no primary URL is present at all.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

/// Identifier of a track, unique within one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A track in a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Uploader display name
    pub artist: String,
    /// Duration in seconds
    pub duration: u64,
    pub play_count: u64,
    pub artwork: ArtworkSet,
}

/// A playlist with its ordered tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub artwork: ArtworkSet,
    /// Owner display name
    pub owner: String,
    /// Track count as reported by the API (may differ from `tracks.len()`)
    pub track_count: u64,
    pub total_play_count: u64,
    pub favorite_count: u64,
    pub repost_count: u64,
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// First line of the description, as shown in the header.
    pub fn summary(&self) -> &str {
        self.description.lines().next().unwrap_or("")
    }

    /// Look up a track by id (first match wins).
    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }
}
