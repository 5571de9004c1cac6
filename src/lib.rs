//! audiogen-daemon: turns text prompts into WAV files.
//!
//! Two interchangeable generators sit behind one contract
//! ([`generator::AudioGenerator`]):
//! - a MusicGen model run through ONNX Runtime, loaded once on first use,
//!   whose 32kHz output is resampled to 44.1kHz
//! - a deterministic keyword synthesizer for running without model files
//!
//! # Modules
//!
//! - [`generator`]: The generator contract and both implementations
//! - [`http`]: axum routes (`/health`, `/generate`, `/test`)
//! - [`models`]: Model traits and the MusicGen backend
//! - [`synth`]: Keyword classification and waveform rendering
//! - [`audio`]: WAV writing and resampling
//! - [`types`]: Requests, clips and audio buffers
//! - [`config`]: Runtime configuration (ServiceConfig, Device)
//! - [`error`]: Error types and codes (GenError, ErrorCode)
//!
//! # Example
//!
//! ```rust,ignore
//! use audiogen_daemon::generator::{AudioGenerator, SynthGenerator};
//!
//! let generator = SynthGenerator::new(std::env::temp_dir());
//! let clip = generator.generate("deep bass synth", 2.0)?;
//! println!("{}", clip.path.display());
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod http;
pub mod logging;
pub mod models;
pub mod synth;
pub mod types;

pub use config::{Device, ServiceConfig, ServiceMode};
pub use error::{ErrorCode, GenError, Result};
pub use generator::{AudioGenerator, GeneratorMode, ModelGenerator, SynthGenerator};
pub use types::{GeneratedClip, GenerationRequest};
