//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the
//! CLI uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`ApiError`], [`ArtworkError`], [`PlayerError`],
//!   [`SequencerError`], [`ConfigError`]) for detailed handling
//!
//! # Example
//!
//! ```ignore
//! use playlist_deck::error::{Result, ResultExt};
//!
//! async fn page(client: &AudiusClient, id: &str) -> Result<Playlist> {
//!     let playlist = client.get_playlist(id).await?;
//!     Ok(playlist)
//! }
//! ```

use crate::audius::ApiError;
use crate::config::ConfigError;
use crate::cover::ArtworkError;
use crate::player::{PlayerError, SequencerError};

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata API error
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Artwork download error
    #[error("Artwork error: {0}")]
    Artwork(#[from] ArtworkError),

    /// Audio playback error
    #[error("Playback error: {0}")]
    Playback(#[from] PlayerError),

    /// Rejected playback request
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: Error = ApiError::NotFound("l5Q60YO".to_string()).into();
        assert!(err.to_string().contains("l5Q60YO"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::from(PlayerError::ChannelClosed).context("while starting track");
        let msg = err.to_string();
        assert!(msg.contains("while starting track"));
        assert!(msg.contains("Audio channel closed"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let with_ctx = result.with_context("writing artwork");
        let msg = with_ctx.unwrap_err().to_string();
        assert!(msg.contains("writing artwork"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_result_ext_on_app_result() {
        let result: Result<()> = Err(Error::invalid_input("track 9"));
        let with_ctx = result.with_context("play command");
        assert!(with_ctx.unwrap_err().to_string().starts_with("play command"));
    }
}
