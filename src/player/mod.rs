//! Streaming audio playback and playlist sequencing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Sequencer (caller's thread)                    │
//! │   Playback state machine: which track owns the output          │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ AudioSink (Player: crossbeam channels)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Decoder Thread                           │
//! │   Downloads, decodes, resamples; emits progress/ended/failed   │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ generation-tagged chunks
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        cpal callback                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sequencer never touches the engine directly; engine events are fed
//! back into it by whoever owns the event loop.

mod audio;
mod decoder;
mod resampler;
mod sequencer;
mod state;

pub use audio::{AudioOutput, EngineOptions};
pub use decoder::AudioDecoder;
pub use sequencer::{Sequencer, SequencerError};
pub use state::{EngineCommand, EngineEvent, EngineState, EngineStatus, LoadId, PlaybackState};

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

use crate::model::TrackId;

/// The single audio output the sequencer drives.
///
/// `load` replaces the source without starting it; `play` starts or
/// resumes whatever is loaded. Events about a source carry the `LoadId`
/// it was loaded with.
pub trait AudioSink {
    fn load(&mut self, load: LoadId, track_id: &TrackId, url: &str) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    fn stop(&mut self) -> Result<(), PlayerError>;
}

/// Streaming player backed by the default output device.
pub struct Player {
    /// Engine state (shared with the decoder thread and output callback)
    state: Arc<RwLock<EngineState>>,
    command_tx: Sender<EngineCommand>,
    event_rx: Receiver<EngineEvent>,
    _audio: AudioOutput,
}

impl Player {
    /// Create a player on the default output device.
    pub fn new(options: EngineOptions) -> Result<Self, PlayerError> {
        let state = Arc::new(RwLock::new(EngineState::default()));
        let (command_tx, command_rx) = bounded(32);
        let (event_tx, event_rx) = bounded(64);

        let audio = AudioOutput::new(Arc::clone(&state), command_rx, event_tx, options)?;

        Ok(Self {
            state,
            command_tx,
            event_rx,
            _audio: audio,
        })
    }

    /// Engine events: progress, end of stream and failures.
    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.event_rx
    }

    /// Set volume (0.0 - 1.0).
    pub fn set_volume(&self, volume: f32) {
        self.state.write().volume = volume.clamp(0.0, 1.0);
    }

    /// Get current volume.
    pub fn volume(&self) -> f32 {
        self.state.read().volume
    }

    /// Get current engine state snapshot.
    pub fn state(&self) -> EngineState {
        self.state.read().clone()
    }

    fn send(&self, command: EngineCommand) -> Result<(), PlayerError> {
        self.command_tx
            .send(command)
            .map_err(|_| PlayerError::ChannelClosed)
    }
}

impl AudioSink for Player {
    fn load(&mut self, load: LoadId, track_id: &TrackId, url: &str) -> Result<(), PlayerError> {
        self.send(EngineCommand::Load {
            load,
            track_id: track_id.clone(),
            url: url.to_string(),
        })
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.send(EngineCommand::Play)
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.send(EngineCommand::Pause)
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.send(EngineCommand::Stop)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.command_tx.try_send(EngineCommand::Shutdown);
    }
}

/// Player errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlayerError {
    #[error("Audio output initialization failed: {0}")]
    AudioInit(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Audio channel closed")]
    ChannelClosed,

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Stream unavailable: {0}")]
    Stream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_error_display() {
        let err = PlayerError::Stream("HTTP status 404".to_string());
        assert_eq!(err.to_string(), "Stream unavailable: HTTP status 404");
        assert_eq!(PlayerError::ChannelClosed.to_string(), "Audio channel closed");
    }

    #[test]
    fn test_engine_options_default() {
        let options = EngineOptions::default();
        assert_eq!(options.progress_interval.as_millis(), 250);
        assert_eq!(options.stream_timeout.as_secs(), 120);
    }
}
