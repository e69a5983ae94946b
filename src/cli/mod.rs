//! Command-line interface for playlist-deck.
//!
//! This module provides commands for showing a playlist page, playing it
//! interactively and downloading its artwork.

mod commands;

pub use commands::{Cli, Commands, run_command};
