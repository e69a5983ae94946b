//! Audius API integration
//!
//! Fetches playlist and track metadata and knows the stream endpoint
//! layout. The API itself is an opaque collaborator: responses are parsed
//! into DTOs and converted into [`crate::model`] types by the adapter.
//!
//! API docs: https://docs.audius.org/developers/api

pub mod dto;
mod adapter;
mod client;

pub use adapter::{to_artwork, to_playlist, to_track};
pub use client::{AudiusClient, USER_AGENT, stream_url};

/// Errors talking to the metadata API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {0}")]
    Http(String),

    #[error("Playlist not found: {0}")]
    NotFound(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
