//! Playlist Deck - a terminal playlist page with streaming playback.
//!
//! Fetches a playlist from the Audius API, prints it as a page, plays its
//! tracks one at a time and downloads artwork with mirror fallback.

pub mod audius;
pub mod cli;
pub mod config;
pub mod cover;
pub mod display;
pub mod error;
pub mod model;
pub mod player;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so they don't interleave with the page on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    cli::run_command(&args)
}
