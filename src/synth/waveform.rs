//! Oscillator shapes and the tone profiles built from them.

use std::f64::consts::PI;

/// Basic oscillator shapes, all in the range [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    /// Rising ramp with period `1 / frequency`, centered on zero.
    Sawtooth,
    /// Sign of the sine at the same frequency (0 at the sine's zeros).
    Square,
}

impl Waveform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }

    /// Evaluates the oscillator at time `t` seconds.
    pub fn sample(&self, frequency_hz: f32, t: f32) -> f32 {
        let phase = frequency_hz as f64 * t as f64;
        let value = match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Sawtooth => 2.0 * (phase - (phase + 0.5).floor()),
            Waveform::Square => sign((2.0 * PI * phase).sin()),
        };
        value as f32
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// f64::signum maps 0.0 to 1.0; a square wave must stay at 0 there.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Everything needed to render one class of tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile {
    /// Carrier frequency in Hz.
    pub frequency_hz: f32,
    pub waveform: Waveform,
    /// Exponential decay rate; the envelope is `exp(-decay_rate * t)`.
    pub decay_rate: f32,
    /// Gain applied after the envelope, before peak normalization.
    pub scale: f32,
}

impl ToneProfile {
    /// 440 Hz sine, fast decay.
    pub const BELL: ToneProfile = ToneProfile {
        frequency_hz: 440.0,
        waveform: Waveform::Sine,
        decay_rate: 2.0,
        scale: 1.0,
    };

    /// 110 Hz sawtooth, slow decay.
    pub const BASS: ToneProfile = ToneProfile {
        frequency_hz: 110.0,
        waveform: Waveform::Sawtooth,
        decay_rate: 1.0,
        scale: 0.5,
    };

    /// 220 Hz square, medium decay.
    pub const LEAD: ToneProfile = ToneProfile {
        frequency_hz: 220.0,
        waveform: Waveform::Square,
        decay_rate: 1.5,
        scale: 0.3,
    };

    /// Envelope value at time `t`.
    pub fn envelope(&self, t: f32) -> f32 {
        (-(self.decay_rate as f64) * t as f64).exp() as f32
    }

    /// Renders the enveloped, scaled waveform over the given time points.
    pub fn render(&self, t: &[f32]) -> Vec<f32> {
        t.iter()
            .map(|&t| self.waveform.sample(self.frequency_hz, t) * self.envelope(t) * self.scale)
            .collect()
    }
}
