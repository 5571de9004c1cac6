//! Core types for the audiogen daemon.
//!
//! - [`GenerationRequest`]: A validated prompt and duration
//! - [`AudioBuffer`]: Planar samples at a known sample rate
//! - [`GeneratedClip`]: A finished WAV file owned by the caller

mod buffer;
mod clip;
mod request;

pub use buffer::AudioBuffer;
pub use clip::GeneratedClip;
pub use request::{validate_duration, validate_prompt, GenerationRequest, DEFAULT_DURATION_SEC};
