//! MusicGen over ONNX Runtime.
//!
//! Pipeline per prompt:
//! - [`text_encoder`]: tokenizer + T5 encoder
//! - [`decoder`]: guided, top-k sampled decoding with a KV cache
//! - [`delay_pattern`]: codebook delay bookkeeping
//! - [`audio_codec`]: EnCodec frames to 32kHz audio

pub mod audio_codec;
pub mod config;
pub mod decoder;
pub mod delay_pattern;
pub mod logits;
pub mod text_encoder;

use std::path::{Path, PathBuf};
use std::time::Instant;

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Device, ServiceConfig};
use crate::error::Result;
use crate::types::DEFAULT_DURATION_SEC;

use super::download::{check_models, ensure_models};
use super::session::{resolve_device, SessionOptions};
use super::{ModelLoader, MusicModel};

pub use audio_codec::AudioCodec;
pub use config::MusicGenConfig;
pub use decoder::Decoder;
pub use text_encoder::TextEncoder;

/// EnCodec frames per second of audio.
pub const TOKENS_PER_SECOND: f32 = 50.0;

/// Frames needed for `duration_sec` of audio (at least one).
pub fn frames_for_duration(duration_sec: f32) -> usize {
    ((duration_sec * TOKENS_PER_SECOND).ceil() as usize).max(1)
}

/// A loaded MusicGen model.
pub struct MusicGen {
    text_encoder: TextEncoder,
    decoder: Decoder,
    codec: AudioCodec,
    config: MusicGenConfig,
    device: &'static str,
    version: String,
    duration_sec: f32,
    rng: StdRng,
}

impl MusicGen {
    /// Loads every session from `model_dir`. Files must already be present.
    pub fn load(model_dir: &Path, device: Device, threads: Option<u32>) -> Result<Self> {
        check_models(model_dir)?;

        let resolved = resolve_device(device);
        let options = SessionOptions {
            providers: resolved.providers,
            intra_threads: threads.map(|t| t as usize),
        };
        let config = MusicGenConfig::load_or_default(model_dir)?;

        tracing::info!(dir = %model_dir.display(), device = resolved.name, "loading MusicGen");
        let text_encoder = TextEncoder::load(model_dir, &options)?;
        let decoder = Decoder::load(model_dir, config, &options)?;
        let codec = AudioCodec::load(model_dir, &options)?;

        Ok(Self {
            text_encoder,
            decoder,
            codec,
            config,
            device: resolved.name,
            version: detect_version(model_dir),
            duration_sec: DEFAULT_DURATION_SEC,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn config(&self) -> &MusicGenConfig {
        &self.config
    }
}

impl MusicModel for MusicGen {
    fn native_sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn set_duration(&mut self, duration_sec: f32) {
        self.duration_sec = duration_sec;
    }

    fn generate(&mut self, prompt: &str) -> Result<Array3<f32>> {
        let frames = frames_for_duration(self.duration_sec);
        let started = Instant::now();

        let encoded = self.text_encoder.encode(prompt)?;
        tracing::debug!(tokens = encoded.token_count, frames, "prompt encoded");

        let tokens = self.decoder.generate(encoded, frames, &mut self.rng)?;
        let audio = self.codec.decode(&tokens)?;

        tracing::debug!(
            frames = tokens.len(),
            samples = audio.dim().2,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "MusicGen generation finished"
        );
        Ok(audio)
    }

    fn device(&self) -> &str {
        self.device
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Names the model after its directory, e.g. `musicgen-small-fp16`.
fn detect_version(model_dir: &Path) -> String {
    let name = model_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();

    let size = if name.contains("medium") { "medium" } else { "small" };
    let precision = if name.contains("fp32") { "fp32" } else { "fp16" };
    format!("musicgen-{}-{}", size, precision)
}

/// Builds [`MusicGen`] from service settings, downloading files if allowed.
#[derive(Debug, Clone)]
pub struct MusicGenLoader {
    pub model_dir: PathBuf,
    pub device: Device,
    pub threads: Option<u32>,
    pub auto_download: bool,
}

impl MusicGenLoader {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            model_dir: config.effective_model_path(),
            device: config.device,
            threads: config.threads,
            auto_download: config.auto_download,
        }
    }
}

impl ModelLoader for MusicGenLoader {
    type Model = MusicGen;

    fn load(&self) -> Result<MusicGen> {
        if self.auto_download {
            ensure_models(&self.model_dir)?;
        }
        MusicGen::load(&self.model_dir, self.device, self.threads)
    }
}
