//! Print a playlist page.

use tokio::runtime::Runtime;

use super::fetch_playlist;
use crate::audius::AudiusClient;
use crate::config::Config;
use crate::display;
use crate::player::PlaybackState;

/// Fetch a playlist and print its header and track list
pub fn cmd_show(rt: &Runtime, config: &Config, playlist_id: Option<&str>) -> anyhow::Result<()> {
    let client = AudiusClient::new(&config.api)?;
    let playlist = fetch_playlist(rt, &client, config, playlist_id)?;
    print!("{}", display::render_page(&playlist, &PlaybackState::Idle, 0.0));
    Ok(())
}
