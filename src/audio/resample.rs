//! Sample rate conversion for model output.
//!
//! MusicGen produces 32kHz audio; clips are always persisted at 44.1kHz.
//! Conversion uses rubato's FFT resampler, compensating for its output delay
//! so the result lines up with the input and keeps the same playback length.

use ndarray::Array2;
use rubato::{FftFixedIn, Resampler};

use crate::error::{GenError, Result};
use crate::types::AudioBuffer;

/// Input frames handed to the resampler per call.
const CHUNK_FRAMES: usize = 1024;

/// FFT sub-chunks per input chunk.
const SUB_CHUNKS: usize = 2;

/// Number of output frames that keeps the playback length unchanged.
pub fn expected_frames(input_frames: usize, from_rate: u32, to_rate: u32) -> usize {
    (input_frames as f64 * to_rate as f64 / from_rate as f64).round() as usize
}

/// Converts a buffer to `target_rate`.
///
/// Returns the buffer unchanged (apart from a copy) when it is already at the
/// target rate.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
    let from_rate = buffer.sample_rate();
    if from_rate == target_rate || buffer.is_empty() {
        return Ok(AudioBuffer::new(buffer.samples().clone(), target_rate));
    }

    let channels = buffer.channels();
    let expected = expected_frames(buffer.frames(), from_rate, target_rate);

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        target_rate as usize,
        CHUNK_FRAMES,
        SUB_CHUNKS,
        channels,
    )
    .map_err(|e| GenError::generation_failed(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let input: Vec<Vec<f32>> = (0..channels).map(|c| buffer.channel(c)).collect();
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

    // Keep feeding (zero padded past the end) until the delayed tail is flushed.
    let mut pos = 0;
    while output[0].len() < expected + delay {
        let needed = resampler.input_frames_next();
        let block: Vec<Vec<f32>> = input
            .iter()
            .map(|channel| {
                let mut chunk = vec![0.0f32; needed];
                if pos < channel.len() {
                    let end = (pos + needed).min(channel.len());
                    chunk[..end - pos].copy_from_slice(&channel[pos..end]);
                }
                chunk
            })
            .collect();

        let frames = resampler
            .process(&block, None)
            .map_err(|e| GenError::generation_failed(format!("Resampling failed: {}", e)))?;
        for (dst, src) in output.iter_mut().zip(frames) {
            dst.extend(src);
        }
        pos += needed;
    }

    let data: Vec<f32> = output
        .into_iter()
        .flat_map(|channel| channel.into_iter().skip(delay).take(expected))
        .collect();
    let samples = Array2::from_shape_vec((channels, expected), data)
        .map_err(|e| GenError::generation_failed(format!("Resampled shape mismatch: {}", e)))?;

    Ok(AudioBuffer::new(samples, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn same_rate_is_untouched() {
        let buffer = AudioBuffer::mono(vec![0.1, 0.2, 0.3], 44100);
        let out = resample(&buffer, 44100).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn expected_frames_rounding() {
        assert_eq!(expected_frames(32000, 32000, 44100), 44100);
        assert_eq!(expected_frames(640, 32000, 44100), 882);
        assert_eq!(expected_frames(1, 32000, 44100), 1);
    }

    #[test]
    fn upsampling_keeps_duration() {
        let buffer = AudioBuffer::mono(tone(440.0, 32000, 32000 * 2), 32000);
        let out = resample(&buffer, 44100).unwrap();

        assert_eq!(out.sample_rate(), 44100);
        assert_eq!(out.frames(), 88200);
        assert!((out.duration_sec() - buffer.duration_sec()).abs() <= 1.0 / 44100.0);
    }

    #[test]
    fn upsampling_preserves_amplitude() {
        let buffer = AudioBuffer::mono(tone(440.0, 32000, 32000), 32000);
        let out = resample(&buffer, 44100).unwrap();

        // skip the edges where the filter rings
        let middle = &out.channel(0)[4410..39690];
        let peak = middle.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.02, "peak was {}", peak);
    }

    #[test]
    fn multichannel_shapes() {
        let left = tone(220.0, 32000, 6400);
        let right = tone(330.0, 32000, 6400);
        let data: Vec<f32> = left.into_iter().chain(right).collect();
        let buffer = AudioBuffer::new(Array2::from_shape_vec((2, 6400), data).unwrap(), 32000);

        let out = resample(&buffer, 44100).unwrap();
        assert_eq!(out.channels(), 2);
        assert_eq!(out.frames(), 8820);
    }
}
