//! Prompt-to-WAV generators.
//!
//! Every backend implements [`AudioGenerator`]: take a prompt and a duration,
//! write one new 44.1kHz WAV file, return where it is.
//!
//! - [`ModelGenerator`]: a lazily loaded generative model
//! - [`SynthGenerator`]: the deterministic keyword synthesizer

mod model;
mod synth;

pub use model::ModelGenerator;
pub use synth::SynthGenerator;

use crate::error::Result;
use crate::types::GeneratedClip;

/// Which kind of generator is serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorMode {
    Model,
    Test,
}

impl GeneratorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorMode::Model => "model",
            GeneratorMode::Test => "test",
        }
    }
}

/// Produces a playable audio file from a text prompt.
///
/// Implementations write exactly one new file per successful call and never
/// reuse a path. The first call may block on one-time initialization.
pub trait AudioGenerator: Send + Sync {
    /// Generates a clip of roughly `duration_sec` seconds.
    ///
    /// # Errors
    ///
    /// - `INVALID_INPUT` for an empty prompt or a non-positive duration
    /// - `GENERATION_FAILED` when the backend fails
    /// - `IO_FAILED` when the output file cannot be written
    /// - `MODEL_*` when a model backend could not be initialized
    fn generate(&self, prompt: &str, duration_sec: f32) -> Result<GeneratedClip>;

    fn mode(&self) -> GeneratorMode;

    /// True once the backend can serve without further initialization.
    fn is_ready(&self) -> bool;
}
