//! Artwork disk cache.
//!
//! Caches downloaded artwork to avoid repeated network requests.
//! The key is a SHA-256 of the primary URL, so an image served by a
//! mirror is stored under (and later found by) its primary URL.

use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use super::fetch::LoadedImage;

/// Artwork disk cache.
pub struct ArtworkCache {
    cache_dir: PathBuf,
}

impl ArtworkCache {
    /// Create a new cache in the specified directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            tracing::warn!(target: "cover::cache", dir = %cache_dir.display(), error = %e, "Could not create cache directory");
        }
        Self { cache_dir }
    }

    /// Create a cache in the default location (user cache directory).
    pub fn default_location() -> Self {
        Self::new(default_cache_dir())
    }

    /// Cache directory in use.
    pub fn dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Get a cached image for a primary URL, with the file it came from.
    pub fn get(&self, primary_url: &str) -> Option<(LoadedImage, PathBuf)> {
        let path = self.cache_path(primary_url);
        if !path.exists() {
            return None;
        }

        let data = fs::read(&path).ok()?;

        let mime_type = match path.extension().and_then(|s| s.to_str()) {
            Some("png") => "image/png",
            _ => "image/jpeg",
        };

        let image = LoadedImage {
            data,
            mime_type: mime_type.to_string(),
            url: primary_url.to_string(),
        };
        Some((image, path))
    }

    /// Store an image under its primary URL.
    pub fn put(&self, primary_url: &str, image: &LoadedImage) -> Result<PathBuf, std::io::Error> {
        let ext = if image.mime_type.contains("png") {
            "png"
        } else {
            "jpg"
        };
        let path = self.cache_dir.join(format!("{}.{}", cache_key(primary_url), ext));

        fs::write(&path, &image.data)?;
        Ok(path)
    }

    /// Check if a primary URL is cached.
    pub fn contains(&self, primary_url: &str) -> bool {
        self.cache_path(primary_url).exists()
    }

    fn cache_path(&self, primary_url: &str) -> PathBuf {
        let key = cache_key(primary_url);

        let png_path = self.cache_dir.join(format!("{}.png", key));
        if png_path.exists() {
            return png_path;
        }

        self.cache_dir.join(format!("{}.jpg", key))
    }

    /// Clear all cached artwork.
    pub fn clear(&self) -> Result<(), std::io::Error> {
        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    /// Get the total size of the cache in bytes.
    pub fn size_bytes(&self) -> u64 {
        if !self.cache_dir.exists() {
            return 0;
        }

        fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// `<user cache dir>/playlist-deck/artwork`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("playlist-deck")
        .join("artwork")
}

/// Lowercase hex SHA-256 of the URL.
fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
