//! Player state, engine commands and engine events.

use std::fmt;
use std::time::Duration;

use crate::model::TrackId;

/// Sequencer playback state.
///
/// `Failed` behaves like `Idle` for every transition; it only records why
/// the last track stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(TrackId),
    Paused(TrackId),
    Failed { track_id: TrackId, reason: String },
}

impl PlaybackState {
    /// The track owning the output, if any. `Failed` has none.
    pub fn current_track(&self) -> Option<&TrackId> {
        match self {
            Self::Playing(id) | Self::Paused(id) => Some(id),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    /// Whether `track_id` is the track owning the output.
    pub fn is_current(&self, track_id: &TrackId) -> bool {
        self.current_track() == Some(track_id)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Playing(id) => write!(f, "playing {id}"),
            Self::Paused(id) => write!(f, "paused {id}"),
            Self::Failed { track_id, reason } => write!(f, "failed {track_id}: {reason}"),
        }
    }
}

/// Identifies one load of a source.
///
/// Issued by the sequencer on every start, so restarting the same track
/// gets a fresh id and events from the earlier playback no longer match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadId(pub u64);

impl LoadId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for LoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine output status, shared with the output callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineStatus {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
}

/// State shared between the decoder thread and the output callback.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub status: EngineStatus,
    /// Bumped on every load/stop; buffered audio from older generations is dropped
    pub generation: u64,
    /// Position of the audio last handed to the device
    pub position: Duration,
    /// Volume level (0.0 - 1.0)
    pub volume: f32,
    /// Buffer underrun count (for diagnostics)
    pub underruns: u32,
    /// The callback holds no samples and found the chunk buffer empty
    pub starved: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            status: EngineStatus::Stopped,
            generation: 0,
            position: Duration::ZERO,
            volume: 1.0,
            underruns: 0,
            starved: false,
        }
    }
}

/// Commands sent to the decoder thread.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the source; playback starts on the next `Play`
    Load {
        load: LoadId,
        track_id: TrackId,
        url: String,
    },
    /// Start/resume playback
    Play,
    /// Pause playback
    Pause,
    /// Stop playback and drop the source
    Stop,
    /// Shutdown the decoder thread
    Shutdown,
}

/// Events reported by the decoder thread.
///
/// Every event names its load and track so consumers can drop events that
/// arrive after a source switch, including a restart of the same track.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress {
        load: LoadId,
        track_id: TrackId,
        position: Duration,
        /// `None` when the stream does not declare its length
        duration: Option<Duration>,
    },
    Ended {
        load: LoadId,
        track_id: TrackId,
    },
    Failed {
        load: LoadId,
        track_id: TrackId,
        reason: String,
    },
}
