//! GeneratedClip type describing a finished WAV file.

use serde::Serialize;
use std::path::PathBuf;

/// A generated audio file handed to the caller.
///
/// The service writes the file once and never touches it again; deleting it
/// is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedClip {
    /// Full filesystem path to the WAV file.
    pub path: PathBuf,

    /// Sample rate of the file in Hz. Always 44100.
    pub sample_rate: u32,

    /// Prompt the clip was generated from.
    pub prompt: String,

    /// Requested duration in seconds.
    pub duration_sec: f32,
}

impl GeneratedClip {
    /// Returns the path as a UTF-8 string for JSON responses.
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}
