//! Track and playlist artwork.
//!
//! Artwork is served from a primary host with an ordered list of mirror
//! hosts as fallbacks:
//!
//! 1. **Resolver** - pure URL substitution for a given attempt index
//! 2. **Cursor** - the per-image attempt counter, advanced once per failure
//! 3. **Fetcher** - downloads an image, walking the cursor until one loads
//! 4. **Cache** - downloaded images on disk, keyed by primary URL
//!
//! Missing artwork is fine: resolution returns `None` and callers show
//! nothing.

mod cache;
mod fetch;
mod resolver;

pub use cache::{ArtworkCache, default_cache_dir};
pub use fetch::{ArtworkFetcher, ArtworkOrigin, FetchedArtwork, HttpImageSource, ImageSource, LoadedImage};
pub use resolver::{MirrorCursor, resolve};

use crate::model::ArtworkSize;

/// Artwork errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtworkError {
    #[error("No {0} artwork published")]
    Missing(ArtworkSize),

    #[error("HTTP {status} loading {url}")]
    Http { url: String, status: u16 },

    #[error("Network error loading {url}: {message}")]
    Network { url: String, message: String },

    #[error("All {attempts} artwork sources failed")]
    Exhausted { attempts: usize },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Artwork IO error: {0}")]
    Io(#[from] std::io::Error),
}
