//! Codebook delay pattern.
//!
//! MusicGen predicts its N EnCodec codebooks in parallel, with codebook `i`
//! running `i` steps behind codebook 0:
//!
//! ```text
//! step  0 1 2 3 4 5
//! cb 0  x x x x x x
//! cb 1  P x x x x x
//! cb 2  P P x x x x
//! cb 3  P P P x x x
//! ```
//!
//! Until a codebook has started, its input is the pad token. Aligned frames
//! are read back along the diagonal.

/// Sampled steps for N delayed codebooks.
#[derive(Debug, Clone, Default)]
pub struct DelayPattern<const N: usize> {
    steps: Vec<[i64; N]>,
}

impl<const N: usize> DelayPattern<N> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Records the tokens sampled at one decoder step.
    pub fn push(&mut self, step: [i64; N]) {
        self.steps.push(step);
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Decoder input for the next step.
    ///
    /// Codebook `i` gets the pad token while fewer than `i + 1` steps have
    /// been recorded, otherwise its most recent token.
    pub fn next_input(&self, pad_token_id: i64) -> [i64; N] {
        let mut input = [pad_token_id; N];
        if let Some(last) = self.steps.last() {
            for (i, slot) in input.iter_mut().enumerate() {
                if self.steps.len() > i {
                    *slot = last[i];
                }
            }
        }
        input
    }

    /// The most recent complete frame, read along the diagonal.
    ///
    /// Returns None until N steps have been recorded.
    pub fn last_aligned(&self) -> Option<[i64; N]> {
        let len = self.steps.len();
        if len < N {
            return None;
        }
        let mut frame = [0; N];
        for (i, slot) in frame.iter_mut().enumerate() {
            *slot = self.steps[len - N + i][i];
        }
        Some(frame)
    }
}
