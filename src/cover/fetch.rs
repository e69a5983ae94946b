//! Artwork download with mirror fallback.
//!
//! The fetcher owns nothing but an [`ImageSource`] and an optional cache.
//! For each image it checks the cache, then walks a [`MirrorCursor`]:
//! one load per attempt, advancing on every failure, until an image loads
//! or the mirrors run out.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::cache::ArtworkCache;
use super::resolver::MirrorCursor;
use super::ArtworkError;
use crate::model::{ArtworkSet, ArtworkSize};

/// A downloaded image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Image data (JPEG or PNG)
    pub data: Vec<u8>,
    /// MIME type (image/jpeg or image/png)
    pub mime_type: String,
    /// URL the image was loaded from
    pub url: String,
}

/// Where fetched artwork came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkOrigin {
    /// From the disk cache
    Cached(PathBuf),
    /// Loaded from the primary host
    Primary,
    /// Loaded from `mirrors[index - 1]`
    Mirror(usize),
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedArtwork {
    pub image: LoadedImage,
    pub origin: ArtworkOrigin,
    /// Number of load attempts made (0 for cache hits)
    pub attempts: usize,
}

/// Something that can load an image from a URL.
///
/// Implement this trait to substitute the network in tests.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<LoadedImage, ArtworkError>;
}

/// HTTP image source.
pub struct HttpImageSource {
    http_client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self, ArtworkError> {
        let http_client = reqwest::Client::builder()
            .user_agent(crate::audius::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ArtworkError::Client(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn load(&self, url: &str) -> Result<LoadedImage, ArtworkError> {
        let network = |e: reqwest::Error| ArtworkError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.http_client.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtworkError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let data = response.bytes().await.map_err(network)?.to_vec();

        Ok(LoadedImage {
            data,
            mime_type,
            url: url.to_string(),
        })
    }
}

/// Fetches artwork, falling back through mirrors.
pub struct ArtworkFetcher<S> {
    source: S,
    cache: Option<ArtworkCache>,
}

impl<S: ImageSource> ArtworkFetcher<S> {
    pub fn new(source: S) -> Self {
        Self { source, cache: None }
    }

    /// Serve from and store into `cache`.
    pub fn with_cache(mut self, cache: ArtworkCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&ArtworkCache> {
        self.cache.as_ref()
    }

    /// Fetch one image.
    ///
    /// Each failed load advances to the next mirror exactly once; the same
    /// attempt is never retried.
    pub async fn fetch(
        &self,
        artwork: &ArtworkSet,
        size: ArtworkSize,
    ) -> Result<FetchedArtwork, ArtworkError> {
        let primary = artwork.primary(size).ok_or(ArtworkError::Missing(size))?;

        if let Some((image, path)) = self.cache.as_ref().and_then(|c| c.get(primary)) {
            tracing::debug!(target: "cover::fetch", url = primary, "Artwork cache hit");
            return Ok(FetchedArtwork {
                image,
                origin: ArtworkOrigin::Cached(path),
                attempts: 0,
            });
        }

        let mut cursor = MirrorCursor::new(artwork, size);
        let mut attempts = 0;
        let mut candidate = cursor.current();

        while let Some(url) = candidate {
            attempts += 1;
            match self.source.load(&url).await {
                Ok(image) => {
                    if let Some(cache) = &self.cache
                        && let Err(e) = cache.put(primary, &image)
                    {
                        tracing::warn!(target: "cover::fetch", error = %e, "Failed to cache artwork");
                    }
                    let origin = match cursor.attempt() {
                        0 => ArtworkOrigin::Primary,
                        n => ArtworkOrigin::Mirror(n),
                    };
                    return Ok(FetchedArtwork {
                        image,
                        origin,
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        target: "cover::fetch",
                        attempt = cursor.attempt(),
                        error = %e,
                        "Artwork load failed, advancing"
                    );
                    candidate = cursor.advance();
                }
            }
        }

        Err(ArtworkError::Exhausted { attempts })
    }
}
