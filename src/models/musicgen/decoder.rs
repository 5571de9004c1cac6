//! Autoregressive token generation over the split MusicGen decoder.
//!
//! `decoder_model.onnx` runs the first step and produces the full key/value
//! cache. `decoder_with_past_model.onnx` runs every later step, reusing the
//! encoder cache entries and replacing the decoder ones.

use std::borrow::Cow;
use std::path::Path;

use half::f16;
use ort::session::{Session, SessionInputValue};
use ort::tensor::PrimitiveTensorElementType;
use ort::value::{DynValue, Tensor};
use rand::Rng;

use crate::error::{GenError, Result};
use crate::models::session::SessionOptions;

use super::config::MusicGenConfig;
use super::delay_pattern::DelayPattern;
use super::logits::{Logits, GUIDANCE_SCALE, TOP_K};
use super::text_encoder::EncodedPrompt;

/// EnCodec codebooks predicted per step.
pub const CODEBOOKS: usize = 4;

/// One aligned EnCodec frame.
pub type Frame = [i64; CODEBOOKS];

// conditional + unconditional rows per codebook
const BATCH: usize = 2 * CODEBOOKS;

/// Past key/values for every decoder layer, keyed by decoder input name.
struct KvCache {
    entries: Vec<(String, DynValue)>,
}

impl KvCache {
    /// Takes all four cache tensors per layer from the first decoder pass.
    fn from_outputs(
        layers: usize,
        mut take: impl FnMut(&str) -> Option<DynValue>,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(layers * 4);
        for layer in 0..layers {
            for kind in ["decoder.key", "decoder.value", "encoder.key", "encoder.value"] {
                let value = take_present(&mut take, layer, kind)?;
                entries.push((format!("past_key_values.{layer}.{kind}"), value));
            }
        }
        Ok(Self { entries })
    }

    /// Replaces the self-attention entries after a cached pass.
    ///
    /// Cross-attention entries depend only on the prompt and stay as they are.
    fn update(&mut self, mut take: impl FnMut(&str) -> Option<DynValue>) -> Result<()> {
        for layer in 0..self.entries.len() / 4 {
            self.entries[layer * 4].1 = take_present(&mut take, layer, "decoder.key")?;
            self.entries[layer * 4 + 1].1 = take_present(&mut take, layer, "decoder.value")?;
        }
        Ok(())
    }

    fn inputs(&self) -> impl Iterator<Item = (Cow<'_, str>, SessionInputValue<'_>)> {
        self.entries
            .iter()
            .map(|(name, value)| (Cow::from(name.as_str()), SessionInputValue::from(value.view())))
    }
}

fn take_present(
    take: &mut impl FnMut(&str) -> Option<DynValue>,
    layer: usize,
    kind: &str,
) -> Result<DynValue> {
    let name = format!("present.{layer}.{kind}");
    take(&name).ok_or_else(|| GenError::generation_failed(format!("{} not found in output", name)))
}

/// Decoder sessions plus the settings they need.
pub struct Decoder {
    first_pass: Session,
    with_past: Session,
    config: MusicGenConfig,
}

impl Decoder {
    /// Loads `decoder_model.onnx` and `decoder_with_past_model.onnx`.
    pub fn load(model_dir: &Path, config: MusicGenConfig, options: &SessionOptions) -> Result<Self> {
        Ok(Self {
            first_pass: options.load(&model_dir.join("decoder_model.onnx"))?,
            with_past: options.load(&model_dir.join("decoder_with_past_model.onnx"))?,
            config,
        })
    }

    /// Generates `frames` aligned EnCodec frames for an encoded prompt.
    ///
    /// The delay pattern only yields its first aligned frame after
    /// `CODEBOOKS` steps, so `CODEBOOKS - 1` extra steps are run.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        prompt: EncodedPrompt,
        frames: usize,
        rng: &mut R,
    ) -> Result<Vec<Frame>> {
        let pad = self.config.pad_token_id;
        let steps = frames + CODEBOOKS - 1;

        // batch rows [0, 4) see the prompt, rows [4, 8) see zeros
        let hidden_states = with_unconditional_half(&prompt.hidden_states)?;
        let attention_mask = with_unconditional_half_typed::<i64>(&prompt.attention_mask)?;

        let mut pattern = DelayPattern::<CODEBOOKS>::new();

        let mut cache = {
            let input_ids = step_input_ids(pattern.next_input(pad))?;
            let inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (Cow::from("encoder_attention_mask"), SessionInputValue::from(attention_mask.view())),
                (Cow::from("encoder_hidden_states"), SessionInputValue::from(hidden_states.view())),
                (Cow::from("input_ids"), SessionInputValue::from(input_ids.view())),
            ];

            let mut outputs = self.first_pass.run(inputs).map_err(|e| {
                GenError::generation_failed(format!("Initial decoder inference failed: {}", e))
            })?;

            pattern.push(sample_step(outputs.remove("logits"), rng)?);
            KvCache::from_outputs(self.config.num_hidden_layers, |name| outputs.remove(name))?
        };

        let mut result = Vec::with_capacity(frames);
        for _ in 0..steps {
            let input_ids = step_input_ids(pattern.next_input(pad))?;

            let mut inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (Cow::from("input_ids"), SessionInputValue::from(input_ids.view())),
                (Cow::from("encoder_attention_mask"), SessionInputValue::from(attention_mask.view())),
            ];
            inputs.extend(cache.inputs());

            let mut outputs = self.with_past.run(inputs).map_err(|e| {
                GenError::generation_failed(format!("Decoder with past inference failed: {}", e))
            })?;

            pattern.push(sample_step(outputs.remove("logits"), rng)?);
            if let Some(frame) = pattern.last_aligned() {
                result.push(frame);
            }

            cache.update(|name| outputs.remove(name))?;
        }

        result.truncate(frames);
        Ok(result)
    }
}

/// Guided top-k sample of one decoder step.
fn sample_step<R: Rng + ?Sized>(logits: Option<DynValue>, rng: &mut R) -> Result<Frame> {
    let logits = logits.ok_or_else(|| GenError::generation_failed("logits not found in output"))?;
    let tokens = Logits::from_dyn_value(&logits)?
        .guided(GUIDANCE_SCALE)?
        .sample_top_k(TOP_K, rng)?;

    Frame::try_from(tokens.as_slice()).map_err(|_| {
        GenError::generation_failed(format!(
            "expected {} tokens per step, got {}",
            CODEBOOKS,
            tokens.len()
        ))
    })
}

/// `[8, 1]` decoder input: the step's tokens for both guidance halves.
fn step_input_ids(step: Frame) -> Result<Tensor<i64>> {
    Tensor::from_array(([BATCH, 1], repeat_for_guidance(step)))
        .map_err(|e| GenError::generation_failed(format!("Failed to create input_ids: {}", e)))
}

fn repeat_for_guidance(step: Frame) -> Vec<i64> {
    step.iter().chain(step.iter()).copied().collect()
}

/// Doubles the batch dimension, filling the new half with zeros.
///
/// Encoder states come out as f16 from fp16 exports and f32 otherwise.
fn with_unconditional_half(tensor: &DynValue) -> Result<DynValue> {
    if let Ok(doubled) = with_unconditional_half_typed::<f16>(tensor) {
        return Ok(doubled);
    }
    with_unconditional_half_typed::<f32>(tensor)
}

fn with_unconditional_half_typed<T>(tensor: &DynValue) -> Result<DynValue>
where
    T: PrimitiveTensorElementType + Clone + Default + std::fmt::Debug + 'static,
{
    let (shape, data) = tensor
        .try_extract_tensor::<T>()
        .map_err(|e| GenError::generation_failed(format!("Failed to extract tensor: {}", e)))?;

    let (shape, data) = zero_padded_batch(&shape.iter().copied().collect::<Vec<i64>>(), data);
    Tensor::from_array((shape, data))
        .map(|t| t.into_dyn())
        .map_err(|e| GenError::generation_failed(format!("Failed to create doubled tensor: {}", e)))
}

fn zero_padded_batch<T: Clone + Default>(shape: &[i64], data: &[T]) -> (Vec<usize>, Vec<T>) {
    let mut shape: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    if let Some(batch) = shape.first_mut() {
        *batch *= 2;
    }
    let doubled = data
        .iter()
        .cloned()
        .chain(std::iter::repeat(T::default()).take(data.len()))
        .collect();
    (shape, doubled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_repeat_for_both_halves() {
        assert_eq!(repeat_for_guidance([1, 2, 3, 4]), vec![1, 2, 3, 4, 1, 2, 3, 4]);
        assert_eq!(repeat_for_guidance([1, 2, 3, 4]).len(), BATCH);
    }

    #[test]
    fn unconditional_half_is_zeros() {
        let (shape, data) = zero_padded_batch(&[1, 3], &[1i64, 1, 1]);
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(data, vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn hidden_states_keep_inner_dims() {
        let (shape, data) = zero_padded_batch(&[1, 2, 2], &[0.5f32, -0.5, 1.0, 2.0]);
        assert_eq!(shape, vec![2, 2, 2]);
        assert_eq!(&data[4..], &[0.0; 4]);
    }
}
