//! Audius API Data Transfer Objects
//!
//! These mirror the JSON the API returns and nothing more. Fields the
//! page never reads are not modelled; optional or nullable fields default.
//!
//! API Reference: https://docs.audius.org/developers/api

use serde::{Deserialize, Serialize};

/// Envelope returned by `/v1/playlists/{id}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistResponse {
    /// Matching playlists; only the first is used
    pub data: Vec<Playlist>,
}

/// A playlist as returned by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Playlist {
    pub id: String,
    pub playlist_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub artwork: Option<Artwork>,
    pub user: User,
    #[serde(default)]
    pub track_count: u64,
    #[serde(default)]
    pub total_play_count: u64,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// A track as returned by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artwork: Option<Artwork>,
    pub user: User,
    /// Seconds
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub play_count: u64,
}

/// Artwork URLs keyed by resolution, plus mirror hosts
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Artwork {
    #[serde(rename = "150x150")]
    pub small: Option<String>,
    #[serde(rename = "480x480")]
    pub medium: Option<String>,
    #[serde(rename = "1000x1000")]
    pub large: Option<String>,
    #[serde(default)]
    pub mirrors: Option<Vec<String>>,
}

/// Uploader / owner
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub handle: Option<String>,
}
