//! Error types for the audiogen daemon.
//!
//! Every fallible operation in the generation core returns [`GenError`], which
//! carries an [`ErrorCode`] so the HTTP layer can pick a status without
//! inspecting messages.

use std::fmt;

/// Error codes reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request parameters are unusable.
    /// Trigger: empty prompt, non-positive or non-finite duration.
    InvalidInput,

    /// The synthesis or model step could not produce audio.
    /// Trigger: inference error, OOM, silent buffer.
    GenerationFailed,

    /// The output WAV file could not be created or written.
    /// Trigger: temp directory missing or read-only, disk full.
    IoFailed,

    /// Model files not found at expected path.
    /// Trigger: model directory empty and auto download disabled.
    ModelNotFound,

    /// Failed to load the model into memory.
    /// Trigger: corrupt file, wrong format, OOM during load.
    ModelLoadFailed,

    /// Failed to download model files.
    /// Trigger: network error, disk full during download.
    ModelDownloadFailed,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::GenerationFailed => "GENERATION_FAILED",
            ErrorCode::IoFailed => "IO_FAILED",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::ModelDownloadFailed => "MODEL_DOWNLOAD_FAILED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Prompt must be non-empty and duration positive",
            ErrorCode::GenerationFailed => "Audio generation failed",
            ErrorCode::IoFailed => "Failed to write the generated audio file",
            ErrorCode::ModelNotFound => "Model files not found at expected path",
            ErrorCode::ModelLoadFailed => "Failed to load the generative model",
            ErrorCode::ModelDownloadFailed => "Failed to download model files",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => {
                "Send a non-empty prompt and a positive duration in seconds \
                 (e.g. {\"prompt\": \"deep bass synth\", \"duration\": 3.0})"
            }
            ErrorCode::GenerationFailed => {
                "Try a shorter duration, check system memory, or restart with \
                 AUDIOGEN_DEVICE=cpu"
            }
            ErrorCode::IoFailed => {
                "Check that the output directory exists, is writable and has free space"
            }
            ErrorCode::ModelNotFound => {
                "Enable AUDIOGEN_AUTO_DOWNLOAD or place the MusicGen ONNX files \
                 in the directory given by AUDIOGEN_MODEL_PATH"
            }
            ErrorCode::ModelLoadFailed => {
                "Verify the model files are not corrupted and restart the daemon; \
                 use --test-mode to serve without a model"
            }
            ErrorCode::ModelDownloadFailed => {
                "Check internet connection and disk space (500MB+ required), then restart"
            }
        }
    }

    /// Returns true when the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorCode::InvalidInput)
    }

    /// Returns true for failures raised while bringing the model up.
    pub fn is_init_failure(&self) -> bool {
        matches!(
            self,
            ErrorCode::ModelNotFound | ErrorCode::ModelLoadFailed | ErrorCode::ModelDownloadFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for generation operations.
#[derive(Debug)]
pub struct GenError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GenError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new GenError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an INVALID_INPUT error for empty prompts.
    pub fn empty_prompt() -> Self {
        Self::new(ErrorCode::InvalidInput, "Prompt cannot be empty")
    }

    /// Creates an INVALID_INPUT error for unusable durations.
    pub fn invalid_duration(duration: f32) -> Self {
        Self::new(
            ErrorCode::InvalidInput,
            format!("Invalid duration: {} seconds (must be positive and finite)", duration),
        )
    }

    /// Creates an INVALID_INPUT error with a custom message.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, reason)
    }

    /// Creates a GENERATION_FAILED error.
    pub fn generation_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GenerationFailed,
            format!("Generation failed: {}", reason.into()),
        )
    }

    /// Creates an IO_FAILED error wrapping the underlying I/O error.
    pub fn io_failed(context: impl Into<String>, source: std::io::Error) -> Self {
        let context = context.into();
        Self::with_source(
            ErrorCode::IoFailed,
            format!("{}: {}", context, source),
            source,
        )
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("Model files not found at: {}", path.into()),
        )
    }

    /// Creates a MODEL_LOAD_FAILED error.
    pub fn model_load_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("Failed to load model: {}", reason.into()),
        )
    }

    /// Creates a MODEL_DOWNLOAD_FAILED error.
    pub fn model_download_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelDownloadFailed,
            format!("Failed to download model: {}", reason.into()),
        )
    }

    /// Returns true when the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        self.code.is_client_error()
    }
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for GenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<hound::Error> for GenError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => GenError::io_failed("Failed to write WAV file", io),
            other => GenError::with_source(
                ErrorCode::IoFailed,
                format!("Failed to encode WAV file: {}", other),
                other,
            ),
        }
    }
}

/// Result type alias using GenError.
pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_as_str() {
        assert_eq!(ErrorCode::InvalidInput.as_str(), "INVALID_INPUT");
        assert_eq!(ErrorCode::GenerationFailed.as_str(), "GENERATION_FAILED");
        assert_eq!(ErrorCode::IoFailed.as_str(), "IO_FAILED");
        assert_eq!(ErrorCode::ModelNotFound.as_str(), "MODEL_NOT_FOUND");
        assert_eq!(ErrorCode::ModelLoadFailed.as_str(), "MODEL_LOAD_FAILED");
        assert_eq!(ErrorCode::ModelDownloadFailed.as_str(), "MODEL_DOWNLOAD_FAILED");
    }

    #[test]
    fn only_invalid_input_is_client_error() {
        assert!(ErrorCode::InvalidInput.is_client_error());
        assert!(!ErrorCode::GenerationFailed.is_client_error());
        assert!(!ErrorCode::IoFailed.is_client_error());
        assert!(!ErrorCode::ModelLoadFailed.is_client_error());
    }

    #[test]
    fn init_failures_are_distinct() {
        assert!(ErrorCode::ModelNotFound.is_init_failure());
        assert!(ErrorCode::ModelLoadFailed.is_init_failure());
        assert!(ErrorCode::ModelDownloadFailed.is_init_failure());
        assert!(!ErrorCode::GenerationFailed.is_init_failure());
    }

    #[test]
    fn display_includes_code_and_hint() {
        let err = GenError::invalid_duration(-1.0);
        let text = err.to_string();
        assert!(text.contains("INVALID_INPUT"));
        assert!(text.contains("-1"));
        assert!(text.contains("Recovery:"));
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = GenError::io_failed("Failed to create output file", io);
        assert_eq!(err.code, ErrorCode::IoFailed);
        assert!(err.source().is_some());
        assert!(err.message.contains("read-only"));
    }
}
