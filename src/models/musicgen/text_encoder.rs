//! Prompt tokenization and T5 text encoding.

use std::path::Path;

use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokenizers::Tokenizer;

use crate::error::{GenError, Result};
use crate::models::session::SessionOptions;

/// Encoder output handed to the decoder.
pub struct EncodedPrompt {
    /// `[1, tokens, hidden]`, f32 or f16 depending on the exported graph.
    pub hidden_states: DynValue,
    /// `[1, tokens]` of ones.
    pub attention_mask: DynValue,
    pub token_count: usize,
}

/// Tokenizer plus the T5 encoder session.
pub struct TextEncoder {
    tokenizer: Tokenizer,
    session: Session,
}

impl TextEncoder {
    /// Loads `tokenizer.json` and `text_encoder.onnx` from the model directory.
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json")).map_err(|e| {
            GenError::model_load_failed(format!("Failed to load tokenizer: {}", e))
        })?;

        tokenizer
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| {
                GenError::model_load_failed(format!("Failed to configure tokenizer: {}", e))
            })?;

        let session = options.load(&model_dir.join("text_encoder.onnx"))?;

        Ok(Self { tokenizer, session })
    }

    pub fn encode(&mut self, prompt: &str) -> Result<EncodedPrompt> {
        let ids: Vec<i64> = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| GenError::generation_failed(format!("Tokenization failed: {}", e)))?
            .get_ids()
            .iter()
            .map(|&id| id as i64)
            .collect();
        let token_count = ids.len();

        let input_ids = Tensor::from_array(([1, token_count], ids)).map_err(|e| {
            GenError::generation_failed(format!("Failed to create input tensor: {}", e))
        })?;

        let mut outputs = self
            .session
            .run(ort::inputs![input_ids, ones_mask(token_count)?])
            .map_err(|e| {
                GenError::generation_failed(format!("Text encoder inference failed: {}", e))
            })?;

        let hidden_states = outputs
            .remove("last_hidden_state")
            .ok_or_else(|| GenError::generation_failed("last_hidden_state not found in output"))?;

        // the encoder consumed its mask; the decoder gets its own copy
        Ok(EncodedPrompt {
            hidden_states,
            attention_mask: ones_mask(token_count)?.into_dyn(),
            token_count,
        })
    }
}

fn ones_mask(len: usize) -> Result<Tensor<i64>> {
    Tensor::from_array(([1, len], vec![1i64; len]))
        .map_err(|e| GenError::generation_failed(format!("Failed to create attention mask: {}", e)))
}
