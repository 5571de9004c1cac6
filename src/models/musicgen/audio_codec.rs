//! EnCodec decoding of generated frames into audio.

use std::path::Path;

use half::f16;
use ndarray::Array3;
use ort::session::Session;
use ort::value::{DynValue, Tensor};

use crate::error::{GenError, Result};
use crate::models::session::SessionOptions;

use super::decoder::{Frame, CODEBOOKS};

/// EnCodec decoder session.
pub struct AudioCodec {
    session: Session,
}

impl AudioCodec {
    /// Loads `encodec_decode.onnx` from the model directory.
    pub fn load(model_dir: &Path, options: &SessionOptions) -> Result<Self> {
        Ok(Self {
            session: options.load(&model_dir.join("encodec_decode.onnx"))?,
        })
    }

    /// Decodes frames into audio shaped `[batch, channels, samples]`.
    pub fn decode(&mut self, frames: &[Frame]) -> Result<Array3<f32>> {
        if frames.is_empty() {
            return Err(GenError::generation_failed("no audio frames were generated"));
        }

        let codes = Tensor::from_array(([1usize, 1, CODEBOOKS, frames.len()], codebook_major(frames)))
            .map_err(|e| GenError::generation_failed(format!("Failed to create token tensor: {}", e)))?;

        let mut outputs = self.session.run(ort::inputs![codes]).map_err(|e| {
            GenError::generation_failed(format!("Audio codec inference failed: {}", e))
        })?;

        let audio: DynValue = outputs
            .remove("audio_values")
            .ok_or_else(|| GenError::generation_failed("audio_values not found in output"))?;

        let (shape, samples): (Vec<i64>, Vec<f32>) =
            if let Ok((shape, data)) = audio.try_extract_tensor::<f32>() {
                (shape.iter().copied().collect(), data.to_vec())
            } else if let Ok((shape, data)) = audio.try_extract_tensor::<f16>() {
                (
                    shape.iter().copied().collect(),
                    data.iter().map(|v| f32::from(*v)).collect(),
                )
            } else {
                return Err(GenError::generation_failed(
                    "audio values must be either f16 or f32",
                ));
            };

        to_batch_channel_samples(&shape, samples)
    }
}

/// `[steps][codebook]` to `[codebook][steps]`, flattened.
fn codebook_major(frames: &[Frame]) -> Vec<i64> {
    (0..CODEBOOKS)
        .flat_map(|cb| frames.iter().map(move |frame| frame[cb]))
        .collect()
}

/// Normalizes codec output to three dimensions.
///
/// Rank 3 is used as is; anything else is treated as a single mono row.
fn to_batch_channel_samples(shape: &[i64], samples: Vec<f32>) -> Result<Array3<f32>> {
    let dims = match shape {
        [b, c, n] => (*b as usize, *c as usize, *n as usize),
        _ => (1, 1, samples.len()),
    };
    Array3::from_shape_vec(dims, samples)
        .map_err(|e| GenError::generation_failed(format!("unexpected codec output: {}", e)))
}
