//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-deck\config.toml
//! - macOS: ~/Library/Application Support/playlist-deck/config.toml
//! - Linux: ~/.config/playlist-deck/config.toml
//!
//! Every field has a default, so a missing or partial file is fine.
//! `--config` on the command line points at a different file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::ArtworkSize;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata and streaming API
    pub api: ApiConfig,

    /// Artwork download settings
    pub artwork: ArtworkConfig,

    /// Playback settings
    pub playback: PlaybackConfig,
}

/// Metadata and streaming API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; playlists live at `{base_url}/playlists/{id}` and streams
    /// at `{base_url}/tracks/{id}/stream`
    pub base_url: String,

    /// Sent as the `app_name` query parameter (empty = omit)
    pub app_name: Option<String>,

    /// Playlist used when none is given on the command line
    pub playlist_id: String,

    /// Metadata request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.audius.co/v1".to_string(),
            app_name: Some("playlist-deck".to_string()),
            playlist_id: "l5Q60YO".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Artwork download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Resolution to download: "150x150", "480x480" or "1000x1000"
    pub size: ArtworkSize,

    /// Cache directory (unset = user cache directory)
    pub cache_dir: Option<PathBuf>,

    /// Maximum concurrent downloads
    pub concurrency: usize,

    /// Per-image timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            size: ArtworkSize::Small,
            cache_dir: None,
            concurrency: 4,
            timeout_secs: 15,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How often the engine reports progress, in milliseconds
    pub progress_interval_ms: u64,

    /// Timeout for downloading a track's stream, in seconds
    pub stream_timeout_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 250,
            stream_timeout_secs: 120,
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-deck"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!("Could not determine config directory, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from a specific file
///
/// Returns default config if the file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to a specific file
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[api]"));
        assert!(toml.contains("[artwork]"));
        assert!(toml.contains("[playback]"));
        assert!(toml.contains("size = \"150x150\""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[api]
playlist_id = "abc123"

[artwork]
size = "1000x1000"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.playlist_id, "abc123");
        assert_eq!(config.artwork.size, ArtworkSize::Large);

        assert_eq!(config.api.base_url, "https://api.audius.co/v1");
        assert_eq!(config.artwork.concurrency, 4);
        assert_eq!(config.playback.progress_interval_ms, 250);
    }

    #[test]
    fn test_unknown_artwork_size_is_rejected() {
        let toml = r#"
[artwork]
size = "64x64"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.playlist_id = "xyz".to_string();
        config.artwork.cache_dir = Some(PathBuf::from("/tmp/art"));
        config.playback.progress_interval_ms = 500;

        save_to(&config, &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = load_from(&path);
        assert_eq!(loaded.api.playlist_id, "xyz");
        assert_eq!(loaded.artwork.cache_dir, Some(PathBuf::from("/tmp/art")));
        assert_eq!(loaded.playback.progress_interval_ms, 500);
    }

    #[test]
    fn test_load_missing_or_broken_file_falls_back() {
        let temp = TempDir::new().unwrap();

        let missing = load_from(&temp.path().join("absent.toml"));
        assert_eq!(missing.api.playlist_id, "l5Q60YO");

        let broken = temp.path().join("broken.toml");
        std::fs::write(&broken, "[api\nplaylist_id = ").unwrap();
        let config = load_from(&broken);
        assert_eq!(config.api.playlist_id, "l5Q60YO");
    }
}
