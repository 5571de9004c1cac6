//! Generator backed by a lazily loaded [`MusicModel`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use ndarray::{Array3, Axis};

use crate::audio::{resample, write_unique_wav, OUTPUT_SAMPLE_RATE};
use crate::error::{ErrorCode, GenError, Result};
use crate::models::{ModelLoader, MusicModel};
use crate::types::{validate_duration, validate_prompt, AudioBuffer, GeneratedClip};

use super::{AudioGenerator, GeneratorMode};

/// Serves requests from a model loaded on first use.
///
/// The model is built at most once per generator. A failed load is
/// remembered and returned to every later caller until the process restarts.
/// Calls into the model are serialized; the duration is set and the model
/// invoked under one lock.
pub struct ModelGenerator<L: ModelLoader> {
    loader: L,
    model: OnceLock<Mutex<L::Model>>,
    // guards the load itself; holds the failure once a load has failed
    init: Mutex<Option<(ErrorCode, String)>>,
    output_dir: PathBuf,
}

impl<L: ModelLoader> ModelGenerator<L> {
    pub fn new(loader: L, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            model: OnceLock::new(),
            init: Mutex::new(None),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Loads the model now instead of on the first request.
    pub fn warm_up(&self) -> Result<()> {
        self.model().map(|_| ())
    }

    fn model(&self) -> Result<&Mutex<L::Model>> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let mut failure = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = self.model.get() {
            return Ok(model);
        }
        if let Some((code, message)) = failure.as_ref() {
            return Err(GenError::new(*code, message.clone()));
        }

        tracing::info!("loading model");
        let started = Instant::now();
        match self.loader.load() {
            Ok(model) => {
                tracing::info!(
                    device = model.device(),
                    version = model.version(),
                    sample_rate = model.native_sample_rate(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "model loaded"
                );
                let _ = self.model.set(Mutex::new(model));
                self.model
                    .get()
                    .ok_or_else(|| GenError::model_load_failed("model missing after load"))
            }
            Err(e) => {
                tracing::error!(code = %e.code, error = %e, "model initialization failed");
                *failure = Some((e.code, e.message.clone()));
                Err(e)
            }
        }
    }

    fn run_model(&self, prompt: &str, duration_sec: f32) -> Result<AudioBuffer> {
        let model = self.model()?;
        let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);

        model.set_duration(duration_sec);
        let rate = model.native_sample_rate();
        let audio = model.generate(prompt).map_err(|e| {
            if e.code == ErrorCode::GenerationFailed {
                e
            } else {
                GenError::with_source(ErrorCode::GenerationFailed, e.message.clone(), e)
            }
        })?;
        drop(model);

        first_batch_row(audio, rate)
    }
}

/// Keeps every channel of the first batch entry.
fn first_batch_row(audio: Array3<f32>, sample_rate: u32) -> Result<AudioBuffer> {
    let (batch, channels, samples) = audio.dim();
    if batch == 0 || channels == 0 || samples == 0 {
        return Err(GenError::generation_failed(format!(
            "model returned no audio (shape {:?})",
            audio.dim()
        )));
    }
    Ok(AudioBuffer::new(
        audio.index_axis(Axis(0), 0).to_owned(),
        sample_rate,
    ))
}

impl<L: ModelLoader> AudioGenerator for ModelGenerator<L> {
    fn generate(&self, prompt: &str, duration_sec: f32) -> Result<GeneratedClip> {
        validate_prompt(prompt)?;
        validate_duration(duration_sec)?;

        let started = Instant::now();
        let native = self.run_model(prompt, duration_sec).inspect_err(|e| {
            if !e.code.is_init_failure() {
                tracing::error!(code = %e.code, error = %e, prompt, "generation failed");
            }
        })?;

        let buffer = resample(&native, OUTPUT_SAMPLE_RATE)?;
        let path = write_unique_wav(&buffer, &self.output_dir)?;

        tracing::info!(
            path = %path.display(),
            duration_sec,
            native_rate = native.sample_rate(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated clip"
        );

        Ok(GeneratedClip {
            path,
            sample_rate: OUTPUT_SAMPLE_RATE,
            prompt: prompt.to_string(),
            duration_sec,
        })
    }

    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Model
    }

    fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }
}
