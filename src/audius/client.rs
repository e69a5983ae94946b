//! Audius HTTP client
//!
//! Fetches playlist metadata and builds stream URLs.
//! No API key is required; an `app_name` query parameter identifies us.

use std::time::Duration;

use super::{ApiError, adapter, dto};
use crate::config::ApiConfig;
use crate::model::{Playlist, TrackId};

/// User agent string
pub const USER_AGENT: &str = concat!("playlist-deck/", env!("CARGO_PKG_VERSION"));

/// Build the stream URL for a track: `<base>/tracks/<id>/stream`.
pub fn stream_url(base_url: &str, track_id: &TrackId) -> String {
    format!(
        "{}/tracks/{}/stream",
        base_url.trim_end_matches('/'),
        urlencoding::encode(track_id.as_str())
    )
}

/// Audius API client
pub struct AudiusClient {
    http_client: reqwest::Client,
    base_url: String,
    app_name: Option<String>,
}

impl AudiusClient {
    /// Create a client from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_name: config.app_name.clone().filter(|n| !n.is_empty()),
        })
    }

    /// Base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        let mut url = format!(
            "{}/playlists/{}",
            self.base_url,
            urlencoding::encode(playlist_id)
        );
        if let Some(app_name) = &self.app_name {
            url.push_str("?app_name=");
            url.push_str(&urlencoding::encode(app_name));
        }
        url
    }

    /// Fetch a playlist with its tracks.
    ///
    /// The endpoint returns a list; only the first entry is used.
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Playlist, ApiError> {
        let url = self.playlist_url(playlist_id);
        tracing::debug!(target: "audius::client", %url, "Fetching playlist");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(playlist_id.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            return Err(ApiError::Http(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .json::<dto::PlaylistResponse>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        let playlist = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(playlist_id.to_string()))?;

        tracing::info!(
            target: "audius::client",
            playlist = %playlist.playlist_name,
            tracks = playlist.tracks.len(),
            "Fetched playlist"
        );

        Ok(adapter::to_playlist(playlist))
    }
}
