//! Service configuration module.
//!
//! Contains the runtime configuration for the audio generation service:
//! generator mode, listen address, execution device and path configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution device for ONNX inference.
///
/// Determines which hardware backend to use for model inference. The choice
/// is resolved once, when the model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Use CUDA when ONNX Runtime reports it available, otherwise CPU.
    #[default]
    Auto,

    /// Force CPU execution.
    Cpu,

    /// Use CUDA for NVIDIA GPU acceleration.
    /// Requires CUDA toolkit and compatible GPU.
    Cuda,
}

impl Device {
    /// Returns the string representation of the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }

    /// Parses a device from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(Device::Auto),
            "cpu" => Some(Device::Cpu),
            "cuda" | "gpu" => Some(Device::Cuda),
            _ => None,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which generator backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// MusicGen through ONNX Runtime.
    #[default]
    Model,

    /// Deterministic keyword synthesizer; no model files needed.
    Test,
}

impl ServiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Model => "model",
            ServiceMode::Test => "test",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "model" | "musicgen" => Some(ServiceMode::Model),
            "test" | "synth" => Some(ServiceMode::Test),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default upper bound on requested clip length, in seconds.
pub const DEFAULT_MAX_DURATION_SEC: f32 = 30.0;

/// Runtime configuration for the service.
///
/// Loaded from environment variables at startup, then overridden by
/// command-line flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Generator selection.
    pub mode: ServiceMode,

    /// Interface the HTTP server binds to.
    pub host: String,

    /// Port the HTTP server binds to.
    pub port: u16,

    /// Path to the directory containing MusicGen ONNX model files.
    /// If None, uses the platform-specific default cache location.
    pub model_path: Option<PathBuf>,

    /// Directory generated WAV files are written to.
    /// If None, uses the system temp directory.
    pub output_dir: Option<PathBuf>,

    /// Execution device for inference.
    pub device: Device,

    /// Number of threads for intra-op parallelism in ONNX Runtime.
    /// If None, uses ONNX Runtime's default (typically number of CPU cores).
    pub threads: Option<u32>,

    /// Requests asking for more than this many seconds are clamped.
    pub max_duration_sec: f32,

    /// Download missing model files on first load.
    pub auto_download: bool,
}

impl ServiceConfig {
    /// Creates a new ServiceConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ServiceConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `AUDIOGEN_MODE` - Generator (model, test)
    /// - `AUDIOGEN_HOST` / `AUDIOGEN_PORT` - Listen address
    /// - `AUDIOGEN_MODEL_PATH` - Path to MusicGen model directory
    /// - `AUDIOGEN_OUTPUT_DIR` - Where WAV files are written
    /// - `AUDIOGEN_DEVICE` - Device selection (auto, cpu, cuda)
    /// - `AUDIOGEN_THREADS` - Number of threads for CPU execution
    /// - `AUDIOGEN_MAX_DURATION` - Longest clip a request may ask for
    /// - `AUDIOGEN_AUTO_DOWNLOAD` - Fetch missing model files (true/false)
    ///
    /// Falls back to defaults for unset or unparsable variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(mode) = lookup("AUDIOGEN_MODE").and_then(|s| ServiceMode::parse(&s)) {
            config.mode = mode;
        }

        if let Some(host) = lookup("AUDIOGEN_HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().to_string();
            }
        }

        if let Some(port) = lookup("AUDIOGEN_PORT").and_then(|s| s.trim().parse::<u16>().ok()) {
            config.port = port;
        }

        if let Some(path) = lookup("AUDIOGEN_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("AUDIOGEN_OUTPUT_DIR") {
            config.output_dir = Some(PathBuf::from(path));
        }

        if let Some(device) = lookup("AUDIOGEN_DEVICE").and_then(|s| Device::parse(&s)) {
            config.device = device;
        }

        if let Some(threads) = lookup("AUDIOGEN_THREADS").and_then(|s| s.trim().parse::<u32>().ok()) {
            if threads > 0 {
                config.threads = Some(threads);
            }
        }

        if let Some(max) = lookup("AUDIOGEN_MAX_DURATION").and_then(|s| s.trim().parse::<f32>().ok()) {
            if max.is_finite() && max > 0.0 {
                config.max_duration_sec = max;
            }
        }

        if let Some(flag) = lookup("AUDIOGEN_AUTO_DOWNLOAD").and_then(|s| parse_bool(&s)) {
            config.auto_download = flag;
        }

        config
    }

    /// Returns the effective MusicGen model path, using platform defaults if not specified.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.model_path {
            path.clone()
        } else {
            default_model_path()
        }
    }

    /// Returns the effective output directory, the system temp dir if not specified.
    pub fn effective_output_dir(&self) -> PathBuf {
        if let Some(ref path) = self.output_dir {
            path.clone()
        } else {
            std::env::temp_dir()
        }
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if let Some(threads) = self.threads {
            if threads == 0 {
                return Some("threads must be > 0".to_string());
            }
            if threads > 256 {
                return Some(format!("threads too high: {} (max 256)", threads));
            }
        }

        if !self.max_duration_sec.is_finite() || self.max_duration_sec <= 0.0 {
            return Some(format!(
                "max duration must be positive: {}",
                self.max_duration_sec
            ));
        }

        if self.host.trim().is_empty() {
            return Some("host must not be empty".to_string());
        }

        None
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::Model,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: None,
            output_dir: None,
            device: Device::Auto,
            threads: None,
            max_duration_sec: DEFAULT_MAX_DURATION_SEC,
            auto_download: true,
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns the platform-specific default model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/audiogen/musicgen
/// - Linux: ~/.cache/audiogen/musicgen
/// - Windows: C:\Users\<user>\AppData\Local\audiogen\cache\musicgen
fn default_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "audiogen") {
        proj_dirs.cache_dir().join("musicgen")
    } else {
        PathBuf::from("./models")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn device_parsing() {
        assert_eq!(Device::parse("auto"), Some(Device::Auto));
        assert_eq!(Device::parse("CPU"), Some(Device::Cpu));
        assert_eq!(Device::parse("cuda"), Some(Device::Cuda));
        assert_eq!(Device::parse("gpu"), Some(Device::Cuda));
        assert_eq!(Device::parse("invalid"), None);
    }

    #[test]
    fn device_display() {
        assert_eq!(Device::Auto.to_string(), "auto");
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(ServiceMode::parse("TEST"), Some(ServiceMode::Test));
        assert_eq!(ServiceMode::parse("model"), Some(ServiceMode::Model));
        assert_eq!(ServiceMode::parse("other"), None);
    }

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.mode, ServiceMode::Model);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.max_duration_sec, 30.0);
        assert!(config.auto_download);
        assert_eq!(config.effective_output_dir(), std::env::temp_dir());
    }

    #[test]
    fn reads_environment() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("AUDIOGEN_MODE", "test"),
            ("AUDIOGEN_HOST", "127.0.0.1"),
            ("AUDIOGEN_PORT", "8080"),
            ("AUDIOGEN_OUTPUT_DIR", "/tmp/clips"),
            ("AUDIOGEN_DEVICE", "cpu"),
            ("AUDIOGEN_THREADS", "4"),
            ("AUDIOGEN_MAX_DURATION", "12.5"),
            ("AUDIOGEN_AUTO_DOWNLOAD", "off"),
        ]));

        assert_eq!(config.mode, ServiceMode::Test);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.effective_output_dir(), PathBuf::from("/tmp/clips"));
        assert_eq!(config.device, Device::Cpu);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.max_duration_sec, 12.5);
        assert!(!config.auto_download);
    }

    #[test]
    fn ignores_bad_values() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("AUDIOGEN_PORT", "not-a-port"),
            ("AUDIOGEN_THREADS", "0"),
            ("AUDIOGEN_MAX_DURATION", "-3"),
            ("AUDIOGEN_DEVICE", "tpu"),
        ]));
        let defaults = ServiceConfig::default();

        assert_eq!(config.port, defaults.port);
        assert_eq!(config.threads, None);
        assert_eq!(config.max_duration_sec, defaults.max_duration_sec);
        assert_eq!(config.device, Device::Auto);
    }

    #[test]
    fn config_validation() {
        let mut config = ServiceConfig::new();
        assert!(config.validate().is_none());

        config.threads = Some(0);
        assert!(config.validate().is_some());

        config.threads = Some(4);
        assert!(config.validate().is_none());

        config.max_duration_sec = 0.0;
        assert!(config.validate().is_some());
    }
}
