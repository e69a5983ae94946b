use std::fmt::Write;

use super::{format_count, format_duration};
use crate::model::{Playlist, Track};
use crate::player::PlaybackState;

const BAR_WIDTH: usize = 30;

/// Playlist name, description summary and totals.
pub fn render_header(playlist: &Playlist) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", playlist.name);
    let summary = playlist.summary();
    if !summary.is_empty() {
        let _ = writeln!(out, "{summary}");
    }
    let _ = writeln!(
        out,
        "{} · {} tracks · {} plays · {} favorites · {} reposts",
        playlist.owner,
        playlist.track_count,
        format_count(playlist.total_play_count),
        format_count(playlist.favorite_count),
        format_count(playlist.repost_count),
    );
    out
}

/// One numbered track row. `number` is 1-based.
pub fn render_track_row(number: usize, track: &Track, state: &PlaybackState) -> String {
    let marker = match state {
        PlaybackState::Playing(id) if *id == track.id => '▶',
        PlaybackState::Paused(id) if *id == track.id => '‖',
        PlaybackState::Failed { track_id, .. } if *track_id == track.id => '!',
        _ => ' ',
    };
    format!(
        "{marker} {number:>3}. {} - {} · {} plays  {}",
        track.title,
        track.artist,
        format_count(track.play_count),
        format_duration(track.duration),
    )
}

/// A fixed-width bar for `fraction` in [0, 1].
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// The now-playing line, or `None` when nothing owns the output.
pub fn now_playing(playlist: &Playlist, state: &PlaybackState, progress: f64) -> Option<String> {
    if let PlaybackState::Failed { track_id, reason } = state {
        let title = playlist.track(track_id).map_or(track_id.as_str(), |t| t.title.as_str());
        return Some(format!("Could not play {title}: {reason}"));
    }

    let track = playlist.track(state.current_track()?)?;
    let verb = if state.is_playing() { "Playing" } else { "Paused" };
    let elapsed = (progress.clamp(0.0, 1.0) * track.duration as f64) as u64;

    Some(format!(
        "{verb}: {} - {} {} {} / {}",
        track.title,
        track.artist,
        progress_bar(progress, BAR_WIDTH),
        format_duration(elapsed),
        format_duration(track.duration),
    ))
}

/// The whole page: header, track list and now-playing line.
pub fn render_page(playlist: &Playlist, state: &PlaybackState, progress: f64) -> String {
    let mut out = render_header(playlist);
    out.push('\n');

    if playlist.tracks.is_empty() {
        out.push_str("  (no tracks)\n");
    }
    for (i, track) in playlist.tracks.iter().enumerate() {
        let _ = writeln!(out, "{}", render_track_row(i + 1, track, state));
    }

    if let Some(line) = now_playing(playlist, state, progress) {
        out.push('\n');
        out.push_str(&line);
        out.push('\n');
    }
    out
}
