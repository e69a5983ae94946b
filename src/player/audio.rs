//! Audio output using cpal, fed by a decoder thread.
//!
//! The decoder thread owns the current source. It:
//! - Downloads the stream named by the last `Load` when `Play` arrives
//! - Decodes, remaps channels and resamples to the device format
//! - Hands chunks tagged with the load generation to the output callback
//! - Reports progress, end of stream and failures as [`EngineEvent`]s
//!
//! The output callback drops chunks from an older generation, so a switch
//! never plays a tail of the previous track.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

use super::PlayerError;
use super::decoder::AudioDecoder;
use super::resampler::{Resampler, remix_channels};
use super::state::{EngineCommand, EngineEvent, EngineState, EngineStatus, LoadId};
use crate::model::TrackId;

/// Decoded chunks buffered between the decoder thread and the device.
const CHUNK_BUFFER: usize = 16;

/// Engine timing settings.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Interval between `Progress` events while playing
    pub progress_interval: Duration,
    /// Timeout for downloading a whole stream
    pub stream_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(250),
            stream_timeout: Duration::from_secs(120),
        }
    }
}

/// Device output format.
#[derive(Debug, Clone, Copy)]
struct DeviceFormat {
    sample_rate: u32,
    channels: u16,
}

/// Audio output manager.
pub struct AudioOutput {
    _stream: Stream,
    _decoder_thread: JoinHandle<()>,
}

impl AudioOutput {
    /// Open the default output device and start the decoder thread.
    pub fn new(
        state: Arc<RwLock<EngineState>>,
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        options: EngineOptions,
    ) -> Result<Self, PlayerError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::AudioInit("No output device found".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        tracing::info!(target: "player::audio", "Using audio device: {}", device_name);

        let supported_config = device
            .default_output_config()
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        let format = DeviceFormat {
            sample_rate: supported_config.sample_rate().0,
            channels: supported_config.channels(),
        };
        tracing::info!(
            target: "player::audio",
            "Audio format: {}Hz, {} channels",
            format.sample_rate,
            format.channels
        );

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: supported_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (audio_tx, audio_rx) = bounded::<AudioChunk>(CHUNK_BUFFER);

        let thread_state = Arc::clone(&state);
        let decoder_thread = thread::Builder::new()
            .name("audio-decoder".to_string())
            .spawn(move || {
                decoder_thread_main(thread_state, command_rx, audio_tx, event_tx, format, options);
            })
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        let stream = match supported_config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, audio_rx, state),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, audio_rx, state),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, audio_rx, state),
            other => {
                return Err(PlayerError::AudioInit(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            _decoder_thread: decoder_thread,
        })
    }
}

/// A chunk of device-format samples.
struct AudioChunk {
    generation: u64,
    samples: Vec<f32>,
    timestamp: Duration,
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    audio_rx: Receiver<AudioChunk>,
    state: Arc<RwLock<EngineState>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let mut current: Option<(AudioChunk, usize)> = None;
    let silence = T::from_sample(0.0f32);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let (status, generation, volume) = {
                let s = state.read();
                (s.status, s.generation, s.volume)
            };

            if current
                .as_ref()
                .is_some_and(|(chunk, _)| chunk.generation != generation)
            {
                current = None;
            }

            if status != EngineStatus::Playing {
                data.fill(silence);
                return;
            }

            let mut written = 0;
            while written < data.len() {
                if current.is_none() {
                    // Held across the receive so `starved` never disagrees
                    // with the buffer as seen by the decoder thread
                    let mut s = state.write();
                    match audio_rx.try_recv() {
                        Ok(chunk) if chunk.generation != generation => continue,
                        Ok(chunk) => {
                            s.position = chunk.timestamp;
                            s.starved = false;
                            current = Some((chunk, 0));
                        }
                        Err(_) => {
                            s.underruns += 1;
                            s.starved = true;
                            drop(s);
                            data[written..].fill(silence);
                            return;
                        }
                    }
                }

                if let Some((chunk, offset)) = current.as_mut() {
                    let n = (chunk.samples.len() - *offset).min(data.len() - written);
                    for (out, sample) in data[written..written + n]
                        .iter_mut()
                        .zip(&chunk.samples[*offset..*offset + n])
                    {
                        *out = T::from_sample(sample * volume);
                    }
                    *offset += n;
                    written += n;
                    if *offset >= chunk.samples.len() {
                        current = None;
                    }
                }
            }
        },
        |err| {
            tracing::error!(target: "player::audio", "Audio stream error: {}", err);
        },
        None,
    )
}

/// The source currently owned by the decoder thread.
struct ActiveSource {
    load: LoadId,
    track_id: TrackId,
    decoder: Option<AudioDecoder>,
    resampler: Resampler,
    duration: Option<Duration>,
    /// Decoding finished; waiting for the device to play what's buffered
    draining: bool,
}

/// Decoder thread context - encapsulates mutable state
struct DecoderContext {
    http: Option<reqwest::blocking::Client>,
    format: DeviceFormat,
    pending: Option<(LoadId, TrackId, String)>,
    source: Option<ActiveSource>,
    event_tx: Sender<EngineEvent>,
    last_progress: Instant,
    progress_interval: Duration,
}

impl DecoderContext {
    fn new(event_tx: Sender<EngineEvent>, format: DeviceFormat, options: &EngineOptions) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(crate::audius::USER_AGENT)
            .timeout(options.stream_timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "player::audio", error = %e, "Failed to create stream client");
            })
            .ok();

        Self {
            http,
            format,
            pending: None,
            source: None,
            event_tx,
            last_progress: Instant::now(),
            progress_interval: options.progress_interval,
        }
    }

    /// Handle an engine command, returning whether to continue running
    fn handle_command(&mut self, cmd: EngineCommand, state: &RwLock<EngineState>) -> bool {
        match cmd {
            EngineCommand::Load {
                load,
                track_id,
                url,
            } => {
                tracing::debug!(target: "player::audio", %load, track = %track_id, "Load");
                self.reset(state);
                self.pending = Some((load, track_id, url));
            }
            EngineCommand::Play => match self.pending.take() {
                Some((load, track_id, url)) => self.open(load, track_id, &url, state),
                None if self.source.is_some() => state.write().status = EngineStatus::Playing,
                None => {}
            },
            EngineCommand::Pause => {
                if self.source.is_some() {
                    state.write().status = EngineStatus::Paused;
                }
            }
            EngineCommand::Stop => {
                self.reset(state);
                self.pending = None;
            }
            EngineCommand::Shutdown => return false,
        }
        true
    }

    /// Drop the current source and invalidate buffered audio.
    fn reset(&mut self, state: &RwLock<EngineState>) {
        self.source = None;
        let mut s = state.write();
        s.generation += 1;
        s.status = EngineStatus::Stopped;
        s.position = Duration::ZERO;
        s.starved = false;
    }

    fn open(&mut self, load: LoadId, track_id: TrackId, url: &str, state: &RwLock<EngineState>) {
        state.write().status = EngineStatus::Loading;

        match self.fetch_and_decode(url) {
            Ok(decoder) => {
                let resampler = Resampler::new(
                    decoder.sample_rate(),
                    self.format.sample_rate,
                    self.format.channels,
                );
                let duration = Some(decoder.duration()).filter(|d| !d.is_zero());
                tracing::info!(
                    target: "player::audio",
                    track = %track_id,
                    sample_rate = decoder.sample_rate(),
                    channels = decoder.channels(),
                    "Playing"
                );

                self.source = Some(ActiveSource {
                    load,
                    track_id,
                    decoder: Some(decoder),
                    resampler,
                    duration,
                    draining: false,
                });
                let mut s = state.write();
                s.status = EngineStatus::Playing;
                s.position = Duration::ZERO;
                self.last_progress = Instant::now();
            }
            Err(e) => {
                tracing::error!(target: "player::audio", track = %track_id, error = %e, "Failed to open stream");
                state.write().status = EngineStatus::Stopped;
                self.emit(EngineEvent::Failed {
                    load,
                    track_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn fetch_and_decode(&self, url: &str) -> Result<AudioDecoder, PlayerError> {
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| PlayerError::Stream("Stream client unavailable".to_string()))?;

        let response = http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PlayerError::Stream(e.to_string()))?;

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response
            .bytes()
            .map_err(|e| PlayerError::Stream(e.to_string()))?;
        tracing::debug!(target: "player::audio", bytes = bytes.len(), mime = ?mime_type, "Stream downloaded");

        AudioDecoder::from_bytes(bytes.to_vec(), mime_type.as_deref())
    }

    /// Decode one packet into the device buffer. Returns false once the
    /// device side has gone away.
    fn decode_and_send(&mut self, audio_tx: &Sender<AudioChunk>, state: &RwLock<EngineState>) -> bool {
        let generation = state.read().generation;
        let channels = self.format.channels as usize;
        let Some(source) = self.source.as_mut() else {
            return true;
        };
        let Some(decoder) = source.decoder.as_mut() else {
            return true;
        };

        let from_channels = decoder.channels() as usize;
        let mut decoded = Vec::with_capacity(4096);

        let (samples, timestamp) = match decoder.decode_next(|s| decoded.extend_from_slice(s)) {
            Ok(Some(frame)) => {
                let remixed = remix_channels(&decoded, from_channels, channels);
                (source.resampler.process(&remixed), frame.timestamp)
            }
            Ok(None) => {
                tracing::debug!(target: "player::audio", track = %source.track_id, "Decoding finished");
                source.decoder = None;
                source.draining = true;
                let position = state.read().position;
                (source.resampler.flush(), position)
            }
            Err(e) => {
                let (load, track_id) = (source.load, source.track_id.clone());
                tracing::error!(target: "player::audio", track = %track_id, error = %e, "Decode error");
                self.reset(state);
                self.emit(EngineEvent::Failed {
                    load,
                    track_id,
                    reason: e.to_string(),
                });
                return true;
            }
        };

        if samples.is_empty() {
            return true;
        }

        audio_tx
            .send(AudioChunk {
                generation,
                samples,
                timestamp,
            })
            .is_ok()
    }

    /// Emit `Ended` once a drained source has been played out, including
    /// whatever the output callback was still holding.
    fn check_ended(&mut self, audio_tx: &Sender<AudioChunk>, state: &RwLock<EngineState>) {
        if !self.source.as_ref().is_some_and(|s| s.draining) {
            return;
        }
        let played_out = {
            let s = state.read();
            s.starved && audio_tx.is_empty()
        };
        if !played_out {
            return;
        }

        if let Some(source) = self.source.take() {
            self.emit_progress(&source, state);
            tracing::info!(target: "player::audio", track = %source.track_id, "Playback finished");
            state.write().status = EngineStatus::Stopped;
            self.emit(EngineEvent::Ended {
                load: source.load,
                track_id: source.track_id,
            });
        }
    }

    fn maybe_emit_progress(&mut self, state: &RwLock<EngineState>) {
        if self.last_progress.elapsed() < self.progress_interval {
            return;
        }
        self.last_progress = Instant::now();
        if let Some(source) = self.source.as_ref() {
            self.emit_progress(source, state);
        }
    }

    fn emit_progress(&self, source: &ActiveSource, state: &RwLock<EngineState>) {
        let position = state.read().position;
        self.emit(EngineEvent::Progress {
            load: source.load,
            track_id: source.track_id.clone(),
            position,
            duration: source.duration,
        });
    }

    /// Progress is best-effort; end and failure events must arrive or the
    /// sequencer would wait on this source forever.
    fn emit(&self, event: EngineEvent) {
        let sent = match event {
            EngineEvent::Progress { .. } => self.event_tx.try_send(event).is_ok(),
            _ => self.event_tx.send(event).is_ok(),
        };
        if !sent {
            tracing::trace!(target: "player::audio", "Event dropped, receiver full or gone");
        }
    }
}

/// Main loop for the decoder thread.
fn decoder_thread_main(
    state: Arc<RwLock<EngineState>>,
    command_rx: Receiver<EngineCommand>,
    audio_tx: Sender<AudioChunk>,
    event_tx: Sender<EngineEvent>,
    format: DeviceFormat,
    options: EngineOptions,
) {
    let mut ctx = DecoderContext::new(event_tx, format, &options);

    loop {
        let playing = state.read().status == EngineStatus::Playing;

        // Block on commands when idle, poll when playing
        let command = if playing {
            command_rx.try_recv().ok()
        } else {
            match command_rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            }
        };

        if let Some(cmd) = command
            && !ctx.handle_command(cmd, &state)
        {
            break;
        }

        if state.read().status != EngineStatus::Playing {
            continue;
        }

        ctx.maybe_emit_progress(&state);

        let decoding = ctx.source.as_ref().is_some_and(|s| s.decoder.is_some());
        if decoding && !audio_tx.is_full() {
            if !ctx.decode_and_send(&audio_tx, &state) {
                break;
            }
        } else {
            ctx.check_ended(&audio_tx, &state);
            thread::sleep(Duration::from_millis(5));
        }
    }

    tracing::debug!(target: "player::audio", "Decoder thread exiting");
}
