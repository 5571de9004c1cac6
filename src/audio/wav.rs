//! WAV file writer for generated clips.
//!
//! Writes 32-bit float WAV files using the hound crate. Clips go to uniquely
//! named files so concurrent requests never collide.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{GenError, Result};
use crate::types::AudioBuffer;

/// Prefix of every generated file name.
pub const FILE_PREFIX: &str = "generated_";

/// Builds the WAV header description for a buffer.
fn spec_for(buffer: &AudioBuffer) -> Result<WavSpec> {
    let channels = u16::try_from(buffer.channels())
        .map_err(|_| GenError::generation_failed(format!("too many channels: {}", buffer.channels())))?;
    Ok(WavSpec {
        channels,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    })
}

fn write_samples<W: Write + Seek>(writer: W, buffer: &AudioBuffer) -> Result<()> {
    let mut writer = WavWriter::new(writer, spec_for(buffer)?)?;
    for sample in buffer.interleaved() {
        writer.write_sample(sample)?;
    }
    // finalize flushes the header and drops the underlying handle
    writer.finalize()?;
    Ok(())
}

/// Writes a buffer to the given path, replacing any existing file.
///
/// # Example
///
/// ```ignore
/// use audiogen_daemon::audio::write_wav;
/// use audiogen_daemon::types::AudioBuffer;
///
/// let buffer = AudioBuffer::mono(vec![0.0, 0.5, -0.5, 0.0], 44100);
/// write_wav(&buffer, Path::new("/tmp/test.wav"))?;
/// ```
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| GenError::io_failed(format!("Failed to create {}", path.display()), e))?;
    write_samples(BufWriter::new(file), buffer)
}

/// Writes a buffer to a freshly created, uniquely named file in `dir`.
///
/// The file name is generated by the OS-backed temp file machinery, so two
/// concurrent calls never return the same path. The file is kept on disk and
/// closed before the path is returned. On a write failure the partial file
/// is removed.
pub fn write_unique_wav(buffer: &AudioBuffer, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| {
        GenError::io_failed(format!("Failed to create output directory {}", dir.display()), e)
    })?;

    let (file, path) = tempfile::Builder::new()
        .prefix(FILE_PREFIX)
        .suffix(".wav")
        .tempfile_in(dir)
        .map_err(|e| GenError::io_failed(format!("Failed to create file in {}", dir.display()), e))?
        .keep()
        .map_err(|e| GenError::io_failed("Failed to persist output file", e.error))?;

    if let Err(e) = write_samples(BufWriter::new(file), buffer) {
        let _ = fs::remove_file(&path);
        return Err(e);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_wav_creates_float_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wav");

        let buffer = AudioBuffer::mono(vec![0.0f32, 0.5, -0.5, 0.0], 44100);
        write_wav(&buffer, &path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        assert_eq!(reader.duration(), 4);
    }

    #[test]
    fn unique_files_do_not_collide() {
        let dir = tempdir().unwrap();
        let buffer = AudioBuffer::mono(vec![0.1; 16], 44100);

        let a = write_unique_wav(&buffer, dir.path()).unwrap();
        let b = write_unique_wav(&buffer, dir.path()).unwrap();

        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        let name = a.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(FILE_PREFIX));
        assert!(name.ends_with(".wav"));
    }

    #[test]
    fn unique_wav_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("clips").join("today");
        let buffer = AudioBuffer::mono(vec![0.2; 8], 44100);

        let path = write_unique_wav(&buffer, &nested).unwrap();
        assert!(path.starts_with(&nested));
    }

    #[test]
    fn stereo_samples_round_trip_interleaved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let buffer = AudioBuffer::new(ndarray::array![[0.25, 0.5], [-0.25, -0.5]], 44100);

        write_wav(&buffer, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.25, -0.25, 0.5, -0.5]);
    }
}
