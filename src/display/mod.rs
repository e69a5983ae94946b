//! Text rendering of the playlist page.
//!
//! Formatting helpers are pure; [`page`] lays the playlist out for a
//! terminal.

mod page;

pub use page::{now_playing, progress_bar, render_header, render_page, render_track_row};

/// Format seconds as `m:ss`. Minutes are not wrapped into hours.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Abbreviate a count: `2.3M`, `1.5K`, or the plain number below 1,000.
pub fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
