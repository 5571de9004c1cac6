//! MusicGen hyperparameters read from `config.json`.

use std::path::Path;

use serde::Deserialize;

use crate::error::{GenError, Result};

/// The subset of the HuggingFace MusicGen config the ONNX pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicGenConfig {
    /// Decoder layers; one KV cache entry set per layer.
    pub num_hidden_layers: usize,
    /// Token fed for codebooks that have not started yet.
    pub pad_token_id: i64,
    /// EnCodec output rate.
    pub sample_rate: u32,
}

impl Default for MusicGenConfig {
    /// musicgen-small.
    fn default() -> Self {
        Self {
            num_hidden_layers: 24,
            pad_token_id: 2048,
            sample_rate: 32000,
        }
    }
}

#[derive(Deserialize)]
struct RawConfig {
    decoder: RawDecoder,
    #[serde(default)]
    audio_encoder: Option<RawAudioEncoder>,
}

#[derive(Deserialize)]
struct RawDecoder {
    num_hidden_layers: Option<usize>,
    pad_token_id: Option<i64>,
}

#[derive(Deserialize)]
struct RawAudioEncoder {
    sampling_rate: Option<u32>,
}

impl MusicGenConfig {
    /// Parses the JSON text of a HuggingFace MusicGen `config.json`.
    ///
    /// Fields absent from the file keep their musicgen-small defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| GenError::model_load_failed(format!("Failed to parse config.json: {}", e)))?;

        let defaults = Self::default();
        Ok(Self {
            num_hidden_layers: raw.decoder.num_hidden_layers.unwrap_or(defaults.num_hidden_layers),
            pad_token_id: raw.decoder.pad_token_id.unwrap_or(defaults.pad_token_id),
            sample_rate: raw
                .audio_encoder
                .and_then(|a| a.sampling_rate)
                .unwrap_or(defaults.sample_rate),
        })
    }

    /// Loads `config.json` from the model directory, or defaults if absent.
    pub fn load_or_default(model_dir: &Path) -> Result<Self> {
        let path = model_dir.join("config.json");
        if !path.exists() {
            tracing::debug!("no config.json, using musicgen-small defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| GenError::model_load_failed(format!("Failed to read config.json: {}", e)))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn parses_nested_sections() {
        let json = r#"{
            "decoder": {"num_hidden_layers": 48, "pad_token_id": 2048, "vocab_size": 2048},
            "audio_encoder": {"sampling_rate": 32000, "codebook_size": 2048},
            "text_encoder": {"d_model": 768}
        }"#;
        let config = MusicGenConfig::from_json(json).unwrap();
        assert_eq!(config.num_hidden_layers, 48);
        assert_eq!(config.pad_token_id, 2048);
        assert_eq!(config.sample_rate, 32000);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = MusicGenConfig::from_json(r#"{"decoder": {}}"#).unwrap();
        assert_eq!(config, MusicGenConfig::default());
    }

    #[test]
    fn missing_decoder_section_is_an_error() {
        let err = MusicGenConfig::from_json("{}").unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelLoadFailed);
    }

    #[test]
    fn absent_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MusicGenConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, MusicGenConfig::default());
    }
}
