//! AudioBuffer: planar sample matrix tagged with its sample rate.

use ndarray::{Array1, Array2, Axis};

/// Audio samples laid out as `[channels, frames]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Array2<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wraps a planar `[channels, frames]` matrix.
    pub fn new(samples: Array2<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Builds a single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        let samples = Array1::from(samples).insert_axis(Axis(0));
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &Array2<f32> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.samples.nrows()
    }

    /// Number of samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length in seconds.
    pub fn duration_sec(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Returns one channel as a contiguous vector.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples.row(index).to_vec()
    }

    /// Frame-major interleaved samples, the order WAV files store them in.
    pub fn interleaved(&self) -> Vec<f32> {
        self.samples.t().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mono_buffer_shape() {
        let buf = AudioBuffer::mono(vec![0.0, 0.5, -0.25], 44100);
        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.peak(), 0.5);
    }

    #[test]
    fn interleaves_frame_major() {
        let buf = AudioBuffer::new(array![[1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]], 32000);
        assert_eq!(buf.interleaved(), vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
    }

    #[test]
    fn duration_from_frames() {
        let buf = AudioBuffer::mono(vec![0.0; 32000], 32000);
        assert_eq!(buf.duration_sec(), 1.0);
    }
}
