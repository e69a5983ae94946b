//! Sample-format conversion between a decoded stream and the device.
//!
//! Streams arrive at whatever rate and channel count they were uploaded
//! with; the output device has its own. Channels are remapped first, then
//! the rate is converted with rubato so tracks don't play at the wrong
//! pitch or speed.

use rubato::{FftFixedIn, Resampler as RubatoResampler};

/// Input frames per resampling block. Larger = more efficient, more latency.
const CHUNK_FRAMES: usize = 1024;

/// Remap interleaved samples from `from` channels to `to` channels.
///
/// Extra output channels repeat the last input channel (mono plays on
/// both speakers); surplus input channels are dropped.
pub fn remix_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let mut output = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            output.push(frame[ch.min(from - 1)]);
        }
    }
    output
}

/// Sample rate converter for one stream.
pub struct Resampler {
    resampler: Option<FftFixedIn<f32>>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Per-channel input accumulated until a full block is available
    pending: Vec<Vec<f32>>,
}

impl Resampler {
    /// Create a converter. Equal rates pass samples through untouched, as
    /// does a rate pair rubato refuses.
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1) as usize;

        let resampler = if input_rate == output_rate {
            None
        } else {
            match FftFixedIn::<f32>::new(
                input_rate as usize,
                output_rate as usize,
                CHUNK_FRAMES,
                2,
                channels,
            ) {
                Ok(r) => {
                    tracing::info!(
                        target: "player::resampler",
                        "Resampling {}Hz → {}Hz ({} channels)",
                        input_rate,
                        output_rate,
                        channels
                    );
                    Some(r)
                }
                Err(e) => {
                    tracing::warn!(target: "player::resampler", error = %e, "Resampler unavailable, playing at source rate");
                    None
                }
            }
        };

        Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            pending: vec![Vec::new(); channels],
        }
    }

    /// Check if resampling is needed.
    pub fn needs_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Output rate over input rate.
    pub fn ratio(&self) -> f64 {
        self.output_rate as f64 / self.input_rate as f64
    }

    /// Convert interleaved samples. May return fewer (or no) samples while
    /// a block is still filling.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let Some(resampler) = self.resampler.as_mut() else {
            return input.to_vec();
        };

        for (i, sample) in input.iter().enumerate() {
            self.pending[i % self.channels].push(*sample);
        }

        let mut output = Vec::new();
        while self.pending[0].len() >= CHUNK_FRAMES {
            let block: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..CHUNK_FRAMES).collect())
                .collect();

            match resampler.process(&block, None) {
                Ok(resampled) => interleave_into(&resampled, usize::MAX, &mut output),
                Err(e) => tracing::warn!(target: "player::resampler", error = %e, "Resampling error"),
            }
        }
        output
    }

    /// Flush the partially filled block at end of stream.
    pub fn flush(&mut self) -> Vec<f32> {
        let ratio = self.ratio();
        let Some(resampler) = self.resampler.as_mut() else {
            return Vec::new();
        };

        let remaining = self.pending[0].len();
        if remaining == 0 {
            return Vec::new();
        }

        let block: Vec<Vec<f32>> = self
            .pending
            .iter_mut()
            .map(|ch| {
                let mut block: Vec<f32> = ch.drain(..).collect();
                block.resize(CHUNK_FRAMES, 0.0);
                block
            })
            .collect();

        let mut output = Vec::new();
        match resampler.process(&block, None) {
            Ok(resampled) => {
                // Drop the output produced by the zero padding
                let expected = (remaining as f64 * ratio).ceil() as usize;
                interleave_into(&resampled, expected, &mut output);
            }
            Err(e) => tracing::warn!(target: "player::resampler", error = %e, "Resampling flush error"),
        }
        output
    }
}

fn interleave_into(planes: &[Vec<f32>], max_frames: usize, output: &mut Vec<f32>) {
    let Some(first) = planes.first() else {
        return;
    };
    let frames = first.len().min(max_frames);
    output.reserve(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            output.push(plane[frame]);
        }
    }
}
