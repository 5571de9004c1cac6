//! Audio output module.
//!
//! Provides WAV file writing and sample rate conversion for generated audio.

pub mod resample;
pub mod wav;

/// Sample rate every persisted clip uses.
pub const OUTPUT_SAMPLE_RATE: u32 = 44100;

pub use resample::{expected_frames, resample};
pub use wav::{write_unique_wav, write_wav, FILE_PREFIX};
