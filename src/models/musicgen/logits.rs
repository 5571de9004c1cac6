//! Decoder logits: classifier-free guidance and top-k sampling.

use half::f16;
use ndarray::{s, Array2, ArrayView1, Axis};
use ort::value::DynValue;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;

use crate::error::{GenError, Result};

/// Guidance scale applied to every decoder step.
pub const GUIDANCE_SCALE: f32 = 3.0;

/// Only the k most likely tokens are sampled from.
pub const TOP_K: usize = 250;

/// Logits for one decoder step, `[batch, vocab]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Logits(Array2<f32>);

impl Logits {
    pub fn new(values: Array2<f32>) -> Self {
        Self(values)
    }

    /// Reads `[batch, 1, vocab]` decoder output (f32 or f16).
    pub fn from_dyn_value(value: &DynValue) -> Result<Self> {
        let (shape, data): (Vec<usize>, Vec<f32>) =
            if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                (shape.iter().map(|&d| d as usize).collect(), data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_tensor::<f16>() {
                (
                    shape.iter().map(|&d| d as usize).collect(),
                    data.iter().map(|v| f32::from(*v)).collect(),
                )
            } else {
                return Err(GenError::generation_failed("logits must be f32 or f16"));
            };

        let (batch, vocab) = match shape.as_slice() {
            [batch, 1, vocab] => (*batch, *vocab),
            other => {
                return Err(GenError::generation_failed(format!(
                    "expected logits of shape [batch, 1, vocab], got {:?}",
                    other
                )))
            }
        };

        let values = Array2::from_shape_vec((batch, vocab), data)
            .map_err(|e| GenError::generation_failed(format!("bad logits buffer: {}", e)))?;
        Ok(Self(values))
    }

    pub fn dim(&self) -> (usize, usize) {
        self.0.dim()
    }

    /// Combines conditional and unconditional halves of the batch.
    ///
    /// Rows `[0, n)` are conditioned on the prompt, rows `[n, 2n)` on nothing.
    /// Result: `uncond + (cond - uncond) * scale`.
    pub fn guided(self, scale: f32) -> Result<Self> {
        let rows = self.0.nrows();
        if rows % 2 != 0 {
            return Err(GenError::generation_failed(format!(
                "guidance needs an even batch, got {}",
                rows
            )));
        }

        let half = rows / 2;
        let cond = self.0.slice(s![..half, ..]);
        let uncond = self.0.slice(s![half.., ..]);
        Ok(Self(&uncond + &((&cond - &uncond) * scale)))
    }

    /// Draws one token per row from the `k` most likely entries.
    pub fn sample_top_k<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<i64>> {
        self.0
            .axis_iter(Axis(0))
            .map(|row| sample_row(row, k, rng))
            .collect()
    }
}

fn sample_row<R: Rng + ?Sized>(row: ArrayView1<f32>, k: usize, rng: &mut R) -> Result<i64> {
    let mut ranked: Vec<(usize, f32)> = row.iter().copied().enumerate().collect();
    ranked.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k.max(1));

    let max = ranked
        .first()
        .map(|(_, logit)| *logit)
        .ok_or_else(|| GenError::generation_failed("empty logits row"))?;

    // softmax restricted to the top k; the normalizer cancels in WeightedIndex
    let weights = ranked.iter().map(|(_, logit)| (logit - max).exp());
    let distribution = WeightedIndex::new(weights)
        .map_err(|e| GenError::generation_failed(format!("cannot sample logits: {}", e)))?;

    Ok(ranked[distribution.sample(rng)].0 as i64)
}
