//! Playback sequencing over an ordered track list.
//!
//! One sequencer owns one output. It is driven entirely by discrete
//! events on a single thread:
//!
//! - user activation of a track (toggle if it is current, restart otherwise)
//! - progress ticks from the engine
//! - end-of-track, which advances to the next track or goes idle
//! - engine failure, which lands in [`PlaybackState::Failed`]
//!
//! Engine events name the load they belong to. Every start issues a new
//! [`LoadId`], so events from anything but the current load are stale and
//! ignored, even when the same track was restarted.

use crate::audius::stream_url;
use crate::model::{Track, TrackId};

use super::state::{LoadId, PlaybackState};
use super::{AudioSink, PlayerError};

/// Sequencer errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequencerError {
    #[error("Track {0} is not in the playlist")]
    UnknownTrack(TrackId),

    #[error("No track at position {0}")]
    OutOfRange(usize),

    #[error("Playlist has no tracks")]
    Empty,
}

/// What `activate` does for the current state.
enum Activation {
    Pause,
    Resume,
    Start,
}

/// Drives an [`AudioSink`] through a playlist.
pub struct Sequencer<S> {
    tracks: Vec<Track>,
    stream_base: String,
    state: PlaybackState,
    /// Load owning the output, if any
    load: Option<LoadId>,
    last_load: LoadId,
    /// Fraction of the current track played (0.0 - 1.0)
    progress: f64,
    sink: S,
}

impl<S: AudioSink> Sequencer<S> {
    /// Create an idle sequencer. Streams are requested from
    /// `<stream_base>/tracks/<id>/stream`.
    pub fn new(tracks: Vec<Track>, stream_base: impl Into<String>, sink: S) -> Self {
        Self {
            tracks,
            stream_base: stream_base.into(),
            state: PlaybackState::Idle,
            load: None,
            last_load: LoadId::default(),
            progress: 0.0,
            sink,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The load owning the output while a track is playing or paused.
    pub fn current_load(&self) -> Option<LoadId> {
        self.load.filter(|_| self.state.current_track().is_some())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The track owning the output, if any.
    pub fn current_track(&self) -> Option<&Track> {
        let id = self.state.current_track()?;
        self.position_of(id).map(|i| &self.tracks[i])
    }

    /// Whether an engine event belongs to the source owning the output.
    fn owns(&self, load: LoadId, track_id: &TrackId) -> bool {
        self.current_load() == Some(load) && self.state.is_current(track_id)
    }

    /// First position of `track_id` in the list.
    fn position_of(&self, track_id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == track_id)
    }

    /// Activate a track, as a click on its row does.
    ///
    /// The current track toggles between playing and paused; any other
    /// track (or any track while idle or failed) starts from the beginning.
    pub fn activate(&mut self, track_id: &TrackId) -> Result<(), SequencerError> {
        let activation = match &self.state {
            PlaybackState::Playing(current) if current == track_id => Activation::Pause,
            PlaybackState::Paused(current) if current == track_id => Activation::Resume,
            _ => Activation::Start,
        };

        match activation {
            Activation::Pause => match self.sink.pause() {
                Ok(()) => self.state = PlaybackState::Paused(track_id.clone()),
                Err(e) => self.fail(track_id.clone(), e),
            },
            Activation::Resume => match self.sink.play() {
                Ok(()) => self.state = PlaybackState::Playing(track_id.clone()),
                Err(e) => self.fail(track_id.clone(), e),
            },
            Activation::Start => {
                if self.position_of(track_id).is_none() {
                    return Err(SequencerError::UnknownTrack(track_id.clone()));
                }
                self.start(track_id.clone());
            }
        }

        tracing::debug!(target: "player::sequencer", state = %self.state, "Activated");
        Ok(())
    }

    /// Activate the track at a list position.
    pub fn activate_index(&mut self, index: usize) -> Result<(), SequencerError> {
        if self.tracks.is_empty() {
            return Err(SequencerError::Empty);
        }
        let id = self
            .tracks
            .get(index)
            .map(|t| t.id.clone())
            .ok_or(SequencerError::OutOfRange(index))?;
        self.activate(&id)
    }

    /// Play/pause the current track, or start the first one.
    pub fn toggle(&mut self) -> Result<(), SequencerError> {
        match self.state.current_track().cloned() {
            Some(id) => self.activate(&id),
            None => self.activate_index(0),
        }
    }

    /// Skip to the next track; past the last track the sequencer goes idle.
    pub fn next(&mut self) -> Result<(), SequencerError> {
        match self.current_position() {
            Some(position) => {
                self.advance_from(position);
                Ok(())
            }
            None => self.activate_index(0),
        }
    }

    /// Go back one track; on the first track, restart it.
    pub fn previous(&mut self) -> Result<(), SequencerError> {
        let position = self.current_position().unwrap_or(0);
        let id = self
            .tracks
            .get(position.saturating_sub(1))
            .map(|t| t.id.clone())
            .ok_or(SequencerError::Empty)?;
        self.start(id);
        Ok(())
    }

    /// Stop playback and go idle.
    pub fn stop(&mut self) {
        if let Err(e) = self.sink.stop() {
            tracing::warn!(target: "player::sequencer", error = %e, "Failed to stop output");
        }
        self.state = PlaybackState::Idle;
        self.load = None;
        self.progress = 0.0;
    }

    /// Engine progress report. Returns whether it applied to the current load.
    pub fn on_progress_tick(
        &mut self,
        load: LoadId,
        track_id: &TrackId,
        current: f64,
        total: f64,
    ) -> bool {
        if !self.owns(load, track_id) {
            return false;
        }
        if total > 0.0 {
            self.progress = (current / total).clamp(0.0, 1.0);
        }
        true
    }

    /// End of the current track: play the next one, or go idle after the last.
    pub fn on_track_ended(&mut self, load: LoadId, track_id: &TrackId) -> bool {
        if !self.owns(load, track_id) {
            tracing::debug!(target: "player::sequencer", %load, track = %track_id, "Ignoring stale end event");
            return false;
        }
        match self.position_of(track_id) {
            Some(position) => self.advance_from(position),
            None => self.stop(),
        }
        true
    }

    /// The engine could not play the current track.
    pub fn on_playback_failed(
        &mut self,
        load: LoadId,
        track_id: &TrackId,
        reason: impl Into<String>,
    ) -> bool {
        if !self.owns(load, track_id) {
            return false;
        }
        self.fail(track_id.clone(), PlayerError::Stream(reason.into()));
        true
    }

    fn current_position(&self) -> Option<usize> {
        self.state.current_track().and_then(|id| self.position_of(id))
    }

    fn advance_from(&mut self, position: usize) {
        match self.tracks.get(position + 1).map(|t| t.id.clone()) {
            Some(next) => self.start(next),
            None => {
                tracing::info!(target: "player::sequencer", "Reached end of playlist");
                self.stop();
            }
        }
    }

    /// Point the output at a track's stream and play it from the start.
    fn start(&mut self, track_id: TrackId) {
        let url = stream_url(&self.stream_base, &track_id);
        let load = self.last_load.next();
        self.last_load = load;
        self.load = Some(load);
        self.progress = 0.0;

        let started = self
            .sink
            .load(load, &track_id, &url)
            .and_then(|()| self.sink.play());

        match started {
            Ok(()) => {
                tracing::info!(target: "player::sequencer", %load, track = %track_id, "Playing");
                self.state = PlaybackState::Playing(track_id);
            }
            Err(e) => self.fail(track_id, e),
        }
    }

    fn fail(&mut self, track_id: TrackId, error: PlayerError) {
        let reason = match error {
            PlayerError::Stream(reason) => reason,
            other => other.to_string(),
        };
        tracing::warn!(target: "player::sequencer", track = %track_id, %reason, "Playback failed");
        if let Err(e) = self.sink.stop() {
            tracing::debug!(target: "player::sequencer", error = %e, "Stop after failure also failed");
        }
        self.state = PlaybackState::Failed { track_id, reason };
        self.load = None;
        self.progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingSink, SinkCall, mock_tracks};

    const BASE: &str = "https://api.audius.co/v1";

    fn sequencer(ids: &[&str]) -> Sequencer<RecordingSink> {
        Sequencer::new(mock_tracks(ids), BASE, RecordingSink::new())
    }

    fn id(s: &str) -> TrackId {
        TrackId::from(s)
    }

    /// Progress from whatever currently owns the output
    fn tick(seq: &mut Sequencer<RecordingSink>, track: &str, current: f64, total: f64) -> bool {
        let load = seq.current_load().unwrap_or_default();
        seq.on_progress_tick(load, &id(track), current, total)
    }

    fn end(seq: &mut Sequencer<RecordingSink>, track: &str) -> bool {
        let load = seq.current_load().unwrap_or_default();
        seq.on_track_ended(load, &id(track))
    }

    #[test]
    fn test_starts_idle() {
        let seq = sequencer(&["A", "B"]);
        assert_eq!(seq.state(), &PlaybackState::Idle);
        assert_eq!(seq.progress(), 0.0);
        assert!(seq.current_track().is_none());
        assert_eq!(seq.current_load(), None);
    }

    #[test]
    fn test_activate_new_track_loads_stream() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("B")).unwrap();

        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
        assert_eq!(seq.current_track().map(|t| t.title.as_str()), Some("Track B"));
        assert_eq!(
            seq.sink_mut().take_calls(),
            vec![
                SinkCall::Load(id("B"), format!("{BASE}/tracks/B/stream")),
                SinkCall::Play,
            ]
        );
    }

    #[test]
    fn test_every_start_issues_a_new_load() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let first = seq.current_load().unwrap();
        assert_eq!(seq.sink().loads, vec![first]);

        // Toggling keeps the load
        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.current_load(), Some(first));

        seq.previous().unwrap();
        let second = seq.current_load().unwrap();
        assert_ne!(first, second);
        assert_eq!(seq.sink().loads, vec![first, second]);
    }

    #[test]
    fn test_activate_same_track_toggles() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        seq.sink_mut().take_calls();

        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Paused(id("A")));
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Pause]);

        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Play]);
    }

    #[test]
    fn test_toggle_never_accumulates() {
        let mut seq = sequencer(&["A"]);
        seq.activate(&id("A")).unwrap();
        seq.sink_mut().take_calls();

        for i in 0..10 {
            seq.activate(&id("A")).unwrap();
            let expected = if i % 2 == 0 {
                PlaybackState::Paused(id("A"))
            } else {
                PlaybackState::Playing(id("A"))
            };
            assert_eq!(seq.state(), &expected);
        }
        // Ten toggles, no reloads
        let calls = seq.sink_mut().take_calls();
        assert_eq!(calls.len(), 10);
        assert!(!calls.iter().any(|c| matches!(c, SinkCall::Load(..))));
    }

    #[test]
    fn test_pause_failure_lands_in_failed() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        tick(&mut seq, "A", 30.0, 60.0);
        seq.sink_mut().take_calls();
        seq.sink_mut().fail_next_pause = Some("device lost".to_string());

        seq.activate(&id("A")).unwrap();
        assert_eq!(
            seq.state(),
            &PlaybackState::Failed {
                track_id: id("A"),
                reason: "device lost".to_string(),
            }
        );
        assert_eq!(seq.progress(), 0.0);
        assert_eq!(seq.current_load(), None);
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Stop]);
    }

    #[test]
    fn test_resume_failure_lands_in_failed() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        tick(&mut seq, "A", 30.0, 60.0);
        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Paused(id("A")));
        seq.sink_mut().take_calls();
        seq.sink_mut().fail_next_play = Some("device lost".to_string());

        seq.activate(&id("A")).unwrap();
        assert_eq!(
            seq.state(),
            &PlaybackState::Failed {
                track_id: id("A"),
                reason: "device lost".to_string(),
            }
        );
        assert_eq!(seq.progress(), 0.0);
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Stop]);
    }

    #[test]
    fn test_switching_track_resets_progress() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        tick(&mut seq, "A", 30.0, 60.0);
        assert_eq!(seq.progress(), 0.5);

        seq.activate(&id("B")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
        assert_eq!(seq.progress(), 0.0);
    }

    #[test]
    fn test_paused_other_track_starts_fresh() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Paused(id("A")));

        seq.activate(&id("B")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
    }

    #[test]
    fn test_unknown_track_is_rejected() {
        let mut seq = sequencer(&["A"]);
        seq.activate(&id("A")).unwrap();

        let err = seq.activate(&id("Z")).unwrap_err();
        assert_eq!(err, SequencerError::UnknownTrack(id("Z")));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
    }

    #[test]
    fn test_progress_tick() {
        let mut seq = sequencer(&["A"]);
        seq.activate(&id("A")).unwrap();

        assert!(tick(&mut seq, "A", 45.0, 180.0));
        assert_eq!(seq.progress(), 0.25);

        // Unknown total leaves progress alone
        assert!(tick(&mut seq, "A", 90.0, 0.0));
        assert_eq!(seq.progress(), 0.25);

        assert!(tick(&mut seq, "A", 200.0, 180.0));
        assert_eq!(seq.progress(), 1.0);
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
    }

    #[test]
    fn test_stale_progress_is_ignored() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let first = seq.current_load().unwrap();
        seq.activate(&id("B")).unwrap();

        assert!(!seq.on_progress_tick(first, &id("A"), 50.0, 100.0));
        assert_eq!(seq.progress(), 0.0);

        // Nothing is current while idle
        let mut idle = sequencer(&["A"]);
        assert!(!tick(&mut idle, "A", 50.0, 100.0));
    }

    #[test]
    fn test_events_from_before_a_restart_are_ignored() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let before = seq.current_load().unwrap();

        // Previous on the first track restarts A under a new load
        seq.previous().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));

        assert!(!seq.on_progress_tick(before, &id("A"), 170.0, 180.0));
        assert_eq!(seq.progress(), 0.0);
        assert!(!seq.on_track_ended(before, &id("A")));
        assert!(!seq.on_playback_failed(before, &id("A"), "old stream"));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));

        // The restarted playback still advances normally
        assert!(end(&mut seq, "A"));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
    }

    #[test]
    fn test_events_from_before_a_failed_restart_are_ignored() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let before = seq.current_load().unwrap();
        assert!(seq.on_playback_failed(before, &id("A"), "decode error"));

        seq.activate_index(0).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
        assert!(!seq.on_track_ended(before, &id("A")));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
    }

    #[test]
    fn test_end_of_middle_track_plays_next() {
        let mut seq = sequencer(&["A", "B", "C"]);
        seq.activate(&id("B")).unwrap();
        tick(&mut seq, "B", 179.0, 180.0);
        seq.sink_mut().take_calls();

        assert!(end(&mut seq, "B"));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("C")));
        assert_eq!(seq.progress(), 0.0);
        assert_eq!(
            seq.sink_mut().take_calls(),
            vec![
                SinkCall::Load(id("C"), format!("{BASE}/tracks/C/stream")),
                SinkCall::Play,
            ]
        );
    }

    #[test]
    fn test_end_of_last_track_goes_idle_once() {
        let mut seq = sequencer(&["A", "B", "C"]);
        seq.activate(&id("C")).unwrap();
        let load = seq.current_load().unwrap();
        tick(&mut seq, "C", 100.0, 180.0);
        seq.sink_mut().take_calls();

        assert!(seq.on_track_ended(load, &id("C")));
        assert_eq!(seq.state(), &PlaybackState::Idle);
        assert_eq!(seq.progress(), 0.0);
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Stop]);

        // A duplicate end event does nothing
        assert!(!seq.on_track_ended(load, &id("C")));
        assert!(seq.sink_mut().take_calls().is_empty());
    }

    #[test]
    fn test_end_while_paused_still_advances() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        seq.activate(&id("A")).unwrap();

        assert!(end(&mut seq, "A"));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
    }

    #[test]
    fn test_stale_end_is_ignored() {
        let mut seq = sequencer(&["A", "B", "C"]);
        seq.activate(&id("A")).unwrap();
        let first = seq.current_load().unwrap();
        seq.activate(&id("C")).unwrap();

        assert!(!seq.on_track_ended(first, &id("A")));
        // Right load, wrong track
        let current = seq.current_load().unwrap();
        assert!(!seq.on_track_ended(current, &id("A")));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("C")));
    }

    #[test]
    fn test_duplicate_ids_use_first_position() {
        let mut seq = sequencer(&["A", "B", "A", "C"]);
        seq.activate(&id("A")).unwrap();
        end(&mut seq, "A");
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
    }

    #[test]
    fn test_full_playthrough() {
        let mut seq = sequencer(&["A", "B", "C"]);
        seq.activate(&id("A")).unwrap();
        end(&mut seq, "A");
        end(&mut seq, "B");
        assert_eq!(seq.state(), &PlaybackState::Playing(id("C")));
        end(&mut seq, "C");
        assert_eq!(seq.state(), &PlaybackState::Idle);
        assert_eq!(seq.current_load(), None);
    }

    #[test]
    fn test_load_failure_lands_in_failed() {
        let mut seq = sequencer(&["A", "B"]);
        seq.sink_mut().fail_next_load = Some("stream unreachable".to_string());

        seq.activate(&id("A")).unwrap();
        assert_eq!(
            seq.state(),
            &PlaybackState::Failed {
                track_id: id("A"),
                reason: "stream unreachable".to_string(),
            }
        );
        assert_eq!(seq.sink_mut().take_calls(), vec![SinkCall::Stop]);

        // Failed behaves as idle: activating the same track starts it again
        seq.activate(&id("A")).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
    }

    #[test]
    fn test_engine_failure_for_current_track() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let load = seq.current_load().unwrap();
        tick(&mut seq, "A", 10.0, 100.0);

        assert!(seq.on_playback_failed(load, &id("A"), "decode error"));
        assert!(matches!(seq.state(), PlaybackState::Failed { .. }));
        assert_eq!(seq.progress(), 0.0);

        // Later events for the failed track are stale
        assert!(!seq.on_track_ended(load, &id("A")));
        assert!(!seq.on_progress_tick(load, &id("A"), 20.0, 100.0));
        assert!(matches!(seq.state(), PlaybackState::Failed { .. }));
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("A")).unwrap();
        let first = seq.current_load().unwrap();
        seq.activate(&id("B")).unwrap();

        assert!(!seq.on_playback_failed(first, &id("A"), "late error"));
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
    }

    #[test]
    fn test_toggle_next_previous_stop() {
        let mut seq = sequencer(&["A", "B", "C"]);

        seq.toggle().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
        seq.toggle().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Paused(id("A")));

        seq.next().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("B")));
        seq.previous().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));

        // Previous on the first track restarts it
        tick(&mut seq, "A", 50.0, 100.0);
        seq.previous().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
        assert_eq!(seq.progress(), 0.0);

        seq.stop();
        assert_eq!(seq.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_next_past_last_goes_idle() {
        let mut seq = sequencer(&["A", "B"]);
        seq.activate(&id("B")).unwrap();
        seq.next().unwrap();
        assert_eq!(seq.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_empty_playlist() {
        let mut seq = sequencer(&[]);
        assert_eq!(seq.toggle(), Err(SequencerError::Empty));
        assert_eq!(seq.next(), Err(SequencerError::Empty));
        assert_eq!(seq.previous(), Err(SequencerError::Empty));
        assert_eq!(seq.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_activate_index_out_of_range() {
        let mut seq = sequencer(&["A"]);
        assert_eq!(seq.activate_index(3), Err(SequencerError::OutOfRange(3)));
        seq.activate_index(0).unwrap();
        assert_eq!(seq.state(), &PlaybackState::Playing(id("A")));
    }
}
