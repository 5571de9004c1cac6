//! Command-line interface.
//!
//! Without `--prompt` the binary serves HTTP. With `--prompt` it writes a
//! single clip and exits, which is handy for checking a model install.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Device, ServiceConfig, ServiceMode};
use crate::types::DEFAULT_DURATION_SEC;

/// Execution device choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    /// CUDA if available, else CPU
    Auto,
    Cpu,
    Cuda,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => Device::Auto,
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
        }
    }
}

/// audiogen-daemon: text prompt to WAV over HTTP
#[derive(Parser, Debug)]
#[command(name = "audiogen-daemon")]
#[command(about = "Prompt-to-audio generation service (MusicGen or offline synth)")]
#[command(version)]
pub struct Cli {
    /// Generate one clip for this prompt and exit instead of serving
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Clip length in seconds for --prompt
    #[arg(short, long, default_value_t = DEFAULT_DURATION_SEC)]
    pub duration: f32,

    /// Copy the --prompt clip to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use the keyword synthesizer instead of the model
    #[arg(long)]
    pub test_mode: bool,

    /// Directory containing the ONNX model files
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Directory generated WAV files are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Inference device
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Returns true when a one-shot clip was requested.
    pub fn is_one_shot(&self) -> bool {
        self.prompt.is_some()
    }

    /// Applies flags on top of a configuration loaded from the environment.
    pub fn apply_to(&self, config: &mut ServiceConfig) {
        if self.test_mode {
            config.mode = ServiceMode::Test;
        }
        if let Some(ref dir) = self.model_dir {
            config.model_path = Some(dir.clone());
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(device) = self.device {
            config.device = device.into();
        }
    }
}
