//! PCM sample helpers shared by the encoder and the speech detector

use rubato::{FftFixedIn, Resampler};

/// Mix interleaved multi-channel samples down to mono
pub fn downmix<T, F>(samples: &[T], channels: u16, to_f32: F) -> Vec<f32>
where
    T: Copy,
    F: Fn(T) -> f32,
{
    if channels <= 1 {
        return samples.iter().map(|&s| to_f32(s)).collect();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>() / frame.len() as f32)
        .collect()
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Unsigned 8-bit PCM as stored in WAV files (silence is 128)
pub fn f32_to_u8(sample: f32) -> u8 {
    ((sample.clamp(-1.0, 1.0) * 127.0) + 128.0).round() as u8
}

/// Streaming mono resampler.
///
/// Partial blocks are carried between calls so input can arrive in any
/// size. The resampler's own latency is skipped at the start, so output is
/// aligned with input. `flush` feeds padding until the delayed tail is out
/// and trims the output to the length the input implies.
pub struct StreamResampler {
    inner: Option<FftFixedIn<f32>>,
    ratio: f64,
    carry: Vec<f32>,
    /// Leading output frames still to drop
    delay: usize,
    consumed: u64,
    produced: u64,
}

impl StreamResampler {
    const CHUNK_SIZE: usize = 1024;

    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self, String> {
        let inner = if from_rate == to_rate {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, Self::CHUNK_SIZE, 2, 1)
                    .map_err(|e| format!("Resampler init failed: {}", e))?,
            )
        };
        let delay = inner.as_ref().map_or(0, |r| r.output_delay());

        Ok(Self {
            inner,
            ratio: to_rate as f64 / from_rate as f64,
            carry: Vec::new(),
            delay,
            consumed: 0,
            produced: 0,
        })
    }

    /// Resample as many whole blocks as are available
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, String> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(samples.to_vec());
        };

        self.carry.extend_from_slice(samples);
        let mut output = Vec::new();

        loop {
            let needed = resampler.input_frames_next();
            if self.carry.len() < needed {
                break;
            }
            let block: Vec<Vec<f32>> = vec![self.carry.drain(..needed).collect()];
            let resampled = resampler
                .process(&block, None)
                .map_err(|e| format!("Resampling failed: {}", e))?;
            skip_delay(&mut self.delay, &resampled[0], &mut output);
            self.consumed += needed as u64;
        }

        self.produced += output.len() as u64;
        Ok(output)
    }

    /// Drain the carried tail, zero-padded, and trim to the expected length
    pub fn flush(&mut self) -> Result<Vec<f32>, String> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(Vec::new());
        };

        let total_in = self.consumed + self.carry.len() as u64;
        let expected = (total_in as f64 * self.ratio).ceil() as u64;
        let remaining = expected.saturating_sub(self.produced) as usize;
        let mut output = Vec::new();

        // Padding pushes out the tail still held back by the delay
        while output.len() < remaining {
            let needed = resampler.input_frames_next();
            let mut block = std::mem::take(&mut self.carry);
            block.resize(needed.max(block.len()), 0.0);
            let resampled = resampler
                .process(&[block], None)
                .map_err(|e| format!("Resampling failed: {}", e))?;
            if resampled[0].is_empty() {
                break;
            }
            skip_delay(&mut self.delay, &resampled[0], &mut output);
        }

        self.carry.clear();
        output.truncate(remaining);
        self.produced += output.len() as u64;
        self.consumed = total_in;
        Ok(output)
    }
}

fn skip_delay(delay: &mut usize, resampled: &[f32], output: &mut Vec<f32>) {
    let skip = (*delay).min(resampled.len());
    *delay -= skip;
    output.extend_from_slice(&resampled[skip..]);
}
