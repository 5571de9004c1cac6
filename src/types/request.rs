//! GenerationRequest type: a validated prompt and duration.

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};

/// Duration used when a request does not specify one.
pub const DEFAULT_DURATION_SEC: f32 = 3.0;

/// A validated request for a single audio clip.
///
/// Construction through [`GenerationRequest::new`] guarantees a non-empty
/// prompt and a positive, finite duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text description of the desired sound. Never empty after trimming.
    pub prompt: String,

    /// Requested clip length in seconds. Always positive and finite.
    pub duration_sec: f32,
}

impl GenerationRequest {
    /// Validates the raw parameters and builds a request.
    ///
    /// A missing duration falls back to [`DEFAULT_DURATION_SEC`]. The prompt is
    /// kept as given; only its trimmed form is checked for emptiness.
    pub fn new(prompt: impl Into<String>, duration_sec: Option<f32>) -> Result<Self> {
        let prompt = prompt.into();
        validate_prompt(&prompt)?;
        let duration_sec = duration_sec.unwrap_or(DEFAULT_DURATION_SEC);
        validate_duration(duration_sec)?;
        Ok(Self {
            prompt,
            duration_sec,
        })
    }

    /// Caps the duration at `max_sec`, leaving shorter requests untouched.
    pub fn clamp_duration(mut self, max_sec: f32) -> Self {
        if self.duration_sec > max_sec {
            tracing::debug!(
                requested = self.duration_sec,
                max = max_sec,
                "clamping requested duration"
            );
            self.duration_sec = max_sec;
        }
        self
    }
}

/// Fails with INVALID_INPUT when the prompt is empty or whitespace only.
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(GenError::empty_prompt());
    }
    Ok(())
}

/// Fails with INVALID_INPUT unless the duration is positive and finite.
pub fn validate_duration(duration_sec: f32) -> Result<()> {
    if !duration_sec.is_finite() || duration_sec <= 0.0 {
        return Err(GenError::invalid_duration(duration_sec));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn missing_duration_defaults_to_three_seconds() {
        let req = GenerationRequest::new("bell", None).unwrap();
        assert_eq!(req.duration_sec, 3.0);
        assert_eq!(req.prompt, "bell");
    }

    #[test]
    fn whitespace_prompt_is_rejected() {
        let err = GenerationRequest::new("   \t", Some(1.0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn non_positive_and_non_finite_durations_are_rejected() {
        for d in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let err = GenerationRequest::new("bass", Some(d)).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidInput, "duration {}", d);
        }
    }

    #[test]
    fn clamp_only_shortens() {
        let long = GenerationRequest::new("lead", Some(60.0)).unwrap().clamp_duration(30.0);
        assert_eq!(long.duration_sec, 30.0);

        let short = GenerationRequest::new("lead", Some(2.5)).unwrap().clamp_duration(30.0);
        assert_eq!(short.duration_sec, 2.5);
    }
}
