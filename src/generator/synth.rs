use std::path::{Path, PathBuf};

use crate::audio::{write_unique_wav, OUTPUT_SAMPLE_RATE};
use crate::error::Result;
use crate::synth::synthesize;
use crate::types::{validate_prompt, GeneratedClip};

use super::{AudioGenerator, GeneratorMode};

/// Serves requests from the keyword synthesizer. Needs no model files.
#[derive(Debug, Clone)]
pub struct SynthGenerator {
    output_dir: PathBuf,
}

impl SynthGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl AudioGenerator for SynthGenerator {
    fn generate(&self, prompt: &str, duration_sec: f32) -> Result<GeneratedClip> {
        validate_prompt(prompt)?;
        let buffer = synthesize(prompt, duration_sec)?;
        let path = write_unique_wav(&buffer, &self.output_dir)?;

        tracing::info!(path = %path.display(), duration_sec, "synthesized clip");

        Ok(GeneratedClip {
            path,
            sample_rate: OUTPUT_SAMPLE_RATE,
            prompt: prompt.to_string(),
            duration_sec,
        })
    }

    fn mode(&self) -> GeneratorMode {
        GeneratorMode::Test
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::tempdir;

    #[test]
    fn writes_one_file_per_call() {
        let dir = tempdir().unwrap();
        let generator = SynthGenerator::new(dir.path());

        let clip = generator.generate("bell", 0.5).unwrap();
        assert!(clip.path.starts_with(dir.path()));
        assert_eq!(clip.sample_rate, 44100);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn empty_prompt_writes_nothing() {
        let dir = tempdir().unwrap();
        let generator = SynthGenerator::new(dir.path());

        let err = generator.generate("  ", 1.0).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn always_ready_in_test_mode() {
        let generator = SynthGenerator::new(std::env::temp_dir());
        assert!(generator.is_ready());
        assert_eq!(generator.mode(), GeneratorMode::Test);
    }
}
