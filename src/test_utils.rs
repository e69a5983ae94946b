//! Test utilities and fixtures for playlist-deck tests.
//!
//! This module provides common fixture builders and fake collaborators
//! to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use playlist_deck::test_utils::{mock_track, mock_playlist};
//!
//! let playlist = mock_playlist(vec![mock_track("A"), mock_track("B")]);
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cover::{ArtworkError, ImageSource, LoadedImage};
use crate::model::{ArtworkSet, ArtworkSize, Playlist, Track, TrackId};
use crate::player::{AudioSink, LoadId, PlayerError};

/// Creates an artwork set whose primary URLs live on `host`.
pub fn mock_artwork(host: &str, mirrors: &[&str]) -> ArtworkSet {
    ArtworkSet::new(
        ArtworkSize::ALL.map(|size| (size, format!("https://{host}/content/art/{size}.jpg"))),
        mirrors.iter().map(|m| m.to_string()).collect(),
    )
}

/// Creates a track with sensible defaults.
///
/// Customize using struct update syntax:
///
/// ```ignore
/// let track = Track { duration: 65, ..mock_track("A") };
/// ```
pub fn mock_track(id: &str) -> Track {
    Track {
        id: TrackId::new(id),
        title: format!("Track {id}"),
        artist: "Test Artist".to_string(),
        duration: 180,
        play_count: 1_500,
        artwork: mock_artwork("creatornode.example", &["https://mirror.example"]),
    }
}

/// Creates tracks for each id, in order.
pub fn mock_tracks(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| mock_track(id)).collect()
}

/// Creates a playlist wrapping the given tracks.
pub fn mock_playlist(tracks: Vec<Track>) -> Playlist {
    Playlist {
        id: "l5Q60YO".to_string(),
        name: "Test Playlist".to_string(),
        description: "Handpicked tracks\nSecond line".to_string(),
        artwork: mock_artwork("creatornode.example", &[]),
        owner: "Curator".to_string(),
        track_count: tracks.len() as u64,
        total_play_count: 2_300_000,
        favorite_count: 950,
        repost_count: 1_200,
        tracks,
    }
}

/// A call recorded by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Load(TrackId, String),
    Play,
    Pause,
    Stop,
}

/// Audio sink that records calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
    /// Every load id handed to `load`, in order
    pub loads: Vec<LoadId>,
    /// When set, the next `load` fails with this message.
    pub fail_next_load: Option<String>,
    /// When set, the next `play` fails with this message.
    pub fail_next_play: Option<String>,
    /// When set, the next `pause` fails with this message.
    pub fail_next_pause: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded since the last `take_calls`.
    pub fn take_calls(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }
}

impl AudioSink for RecordingSink {
    fn load(&mut self, load: LoadId, track_id: &TrackId, url: &str) -> Result<(), PlayerError> {
        if let Some(reason) = self.fail_next_load.take() {
            return Err(PlayerError::Stream(reason));
        }
        self.loads.push(load);
        self.calls.push(SinkCall::Load(track_id.clone(), url.to_string()));
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        if let Some(reason) = self.fail_next_play.take() {
            return Err(PlayerError::Stream(reason));
        }
        self.calls.push(SinkCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        if let Some(reason) = self.fail_next_pause.take() {
            return Err(PlayerError::Stream(reason));
        }
        self.calls.push(SinkCall::Pause);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.calls.push(SinkCall::Stop);
        Ok(())
    }
}

/// Image source that answers from a script and records requested URLs.
///
/// Each request pops the next scripted outcome; an exhausted script fails.
#[derive(Default)]
pub struct ScriptedImages {
    outcomes: Mutex<VecDeque<bool>>,
    pub requested: Mutex<Vec<String>>,
}

impl ScriptedImages {
    /// `true` entries load successfully, `false` entries fail.
    pub fn new(outcomes: &[bool]) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageSource for ScriptedImages {
    async fn load(&self, url: &str) -> Result<LoadedImage, ArtworkError> {
        self.requested.lock().push(url.to_string());
        match self.outcomes.lock().pop_front() {
            Some(true) => Ok(LoadedImage {
                data: url.as_bytes().to_vec(),
                mime_type: "image/jpeg".to_string(),
                url: url.to_string(),
            }),
            _ => Err(ArtworkError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
