//! Keyword-driven waveform synthesizer.
//!
//! Offline stand-in for the generative model. A prompt is matched against an
//! ordered table of keyword rules; the first rule with a matching keyword
//! picks the tone profile (carrier frequency, waveform, decay, scale). The
//! rendered tone is peak-normalized so every class plays back at the same
//! loudness.
//!
//! - [`waveform`]: Oscillator shapes and tone profiles
//! - [`classify`]: Prompt to tone profile lookup

pub mod waveform;

pub use waveform::{ToneProfile, Waveform};

use crate::audio::OUTPUT_SAMPLE_RATE;
use crate::error::{GenError, Result};
use crate::types::{validate_duration, AudioBuffer};

/// Peak absolute amplitude of every synthesized clip.
pub const TARGET_PEAK: f32 = 0.8;

/// A set of keywords that selects a tone profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordRule {
    /// Lowercase substrings; any one of them matching selects the rule.
    pub keywords: &'static [&'static str],
    pub profile: ToneProfile,
}

impl KeywordRule {
    /// Returns true if any keyword occurs in the (already lowercased) prompt.
    pub fn matches(&self, prompt_lower: &str) -> bool {
        self.keywords.iter().any(|k| prompt_lower.contains(k))
    }
}

/// Keyword rules in evaluation order. The first match wins.
pub const RULES: [KeywordRule; 3] = [
    KeywordRule {
        keywords: &["sine", "bell"],
        profile: ToneProfile::BELL,
    },
    KeywordRule {
        keywords: &["saw", "bass"],
        profile: ToneProfile::BASS,
    },
    KeywordRule {
        keywords: &["square", "lead"],
        profile: ToneProfile::LEAD,
    },
];

/// Profile used when no rule matches.
pub const DEFAULT_PROFILE: ToneProfile = ToneProfile::BELL;

/// Picks the tone profile for a prompt (case-insensitive).
pub fn classify(prompt: &str) -> ToneProfile {
    let lower = prompt.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&lower))
        .map(|rule| rule.profile)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Evenly spaced time points from 0 to `duration_sec` inclusive.
///
/// The axis holds `floor(sample_rate * duration_sec)` points; the last one
/// lands exactly on `duration_sec`.
pub fn time_axis(duration_sec: f32, sample_rate: u32) -> Vec<f32> {
    let len = (sample_rate as f64 * duration_sec as f64) as usize;
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = duration_sec as f64 / (len - 1) as f64;
            (0..len).map(|i| (i as f64 * step) as f32).collect()
        }
    }
}

/// Scales samples in place so the peak absolute value equals `target`.
///
/// Fails on an all-zero buffer, where the gain is undefined.
pub fn normalize_peak(samples: &mut [f32], target: f32) -> Result<()> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 || !peak.is_finite() {
        return Err(GenError::invalid_input(
            "Synthesized buffer is silent; cannot normalize",
        ));
    }
    let gain = target / peak;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
    Ok(())
}

/// Renders a normalized mono tone for `prompt` at 44.1kHz.
pub fn synthesize(prompt: &str, duration_sec: f32) -> Result<AudioBuffer> {
    validate_duration(duration_sec)?;

    let t = time_axis(duration_sec, OUTPUT_SAMPLE_RATE);
    if t.is_empty() {
        return Err(GenError::invalid_input(format!(
            "Duration {}s is shorter than one sample",
            duration_sec
        )));
    }

    let profile = classify(prompt);
    let mut samples = profile.render(&t);
    normalize_peak(&mut samples, TARGET_PEAK)?;

    tracing::debug!(
        waveform = profile.waveform.as_str(),
        frequency_hz = profile.frequency_hz,
        samples = samples.len(),
        "synthesized tone"
    );

    Ok(AudioBuffer::mono(samples, OUTPUT_SAMPLE_RATE))
}

/// Fixed 1 second, 440 Hz sine at half amplitude.
///
/// Used by the `/test` endpoint to check playback end to end without any
/// prompt handling.
pub fn reference_tone() -> AudioBuffer {
    let t = time_axis(1.0, OUTPUT_SAMPLE_RATE);
    let samples = t
        .iter()
        .map(|&t| 0.5 * Waveform::Sine.sample(440.0, t))
        .collect();
    AudioBuffer::mono(samples, OUTPUT_SAMPLE_RATE)
}
