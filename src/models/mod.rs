//! Generative model backends.
//!
//! The service only talks to a model through [`MusicModel`]; loading is
//! deferred to a [`ModelLoader`] so the caller decides when the (slow,
//! fallible) construction happens.
//!
//! - [`musicgen`]: MusicGen small over ONNX Runtime
//! - [`session`]: Execution provider selection and session construction
//! - [`download`]: Model file checks and HuggingFace download

pub mod download;
pub mod musicgen;
pub mod session;

use ndarray::Array3;

use crate::error::Result;

pub use download::{check_models, ensure_models, MODEL_URLS, REQUIRED_MODEL_FILES};
pub use musicgen::{MusicGen, MusicGenLoader};

/// A loaded text-to-audio model.
///
/// Models are stateful: the clip length is set with
/// [`set_duration`](MusicModel::set_duration) and applies to every following
/// [`generate`](MusicModel::generate) call. Callers sharing a model must hold
/// a lock across both calls.
pub trait MusicModel: Send {
    /// Rate of the audio returned by `generate`, in Hz.
    fn native_sample_rate(&self) -> u32;

    /// Sets the length of the next generated clip.
    fn set_duration(&mut self, duration_sec: f32);

    /// Generates audio for one prompt.
    ///
    /// Returns `[batch, channels, samples]` at the native sample rate.
    fn generate(&mut self, prompt: &str) -> Result<Array3<f32>>;

    /// Device the model runs on (e.g. "cpu", "cuda").
    fn device(&self) -> &str;

    /// Model version string.
    fn version(&self) -> &str;
}

/// Builds a [`MusicModel`].
pub trait ModelLoader: Send + Sync {
    type Model: MusicModel;

    fn load(&self) -> Result<Self::Model>;
}
