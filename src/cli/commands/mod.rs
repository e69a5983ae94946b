//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `show`: Print the playlist page
//! - `play`: Interactive playback
//! - `artwork`: Download artwork with mirror fallback
//! - `settings`: Inspect or create the config file

mod artwork;
mod play;
mod settings;
mod show;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

pub use artwork::cmd_artwork;
pub use play::cmd_play;
pub use settings::cmd_config;
pub use show::cmd_show;

use crate::audius::AudiusClient;
use crate::config::{self, Config};
use crate::error::ResultExt;
use crate::model::{ArtworkSize, Playlist};

/// Playlist Deck CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PLAYLIST_DECK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a playlist and print its page
    Show {
        /// Playlist id (defaults to the configured playlist)
        #[arg(short, long)]
        playlist: Option<String>,
    },
    /// Play a playlist interactively
    Play {
        /// Playlist id (defaults to the configured playlist)
        #[arg(short, long)]
        playlist: Option<String>,
        /// Track number to start with (1-based)
        #[arg(short, long)]
        start: Option<usize>,
    },
    /// Download artwork for every track, falling back through mirrors
    Artwork {
        /// Playlist id (defaults to the configured playlist)
        #[arg(short, long)]
        playlist: Option<String>,
        /// Resolution: 150x150, 480x480 or 1000x1000
        #[arg(long)]
        size: Option<ArtworkSize>,
        /// Also copy each image into this directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Empty the artwork cache before downloading
        #[arg(long)]
        clear_cache: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Show { playlist } => cmd_show(&rt, &config, playlist.as_deref()),
        Commands::Play { playlist, start } => cmd_play(&rt, &config, playlist.as_deref(), *start),
        Commands::Artwork {
            playlist,
            size,
            out,
            clear_cache,
        } => cmd_artwork(
            &rt,
            &config,
            playlist.as_deref(),
            *size,
            out.as_ref(),
            *clear_cache,
        ),
        Commands::Config { init } => cmd_config(&config, cli.config.as_ref(), *init),
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Fetch the requested playlist, or the configured one.
pub(crate) fn fetch_playlist(
    rt: &Runtime,
    client: &AudiusClient,
    config: &Config,
    playlist_id: Option<&str>,
) -> anyhow::Result<Playlist> {
    let playlist_id = playlist_id.unwrap_or(&config.api.playlist_id);

    tracing::info!(target: "cli", playlist = playlist_id, "Fetching playlist");
    let playlist = rt
        .block_on(client.get_playlist(playlist_id))
        .with_context(format!("fetching playlist {playlist_id}"))?;
    tracing::info!(
        target: "cli",
        playlist = playlist_id,
        tracks = playlist.tracks.len(),
        "Playlist loaded"
    );
    Ok(playlist)
}
