//! Model file checks and download.
//!
//! Downloads MusicGen ONNX files from HuggingFace when they are missing
//! locally. Each file is streamed to a `.part` sibling and renamed into place
//! once complete, so an interrupted download never leaves a truncated model.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{ErrorCode, GenError, Result};

/// Required model files for MusicGen.
pub const REQUIRED_MODEL_FILES: &[&str] = &[
    "tokenizer.json",
    "text_encoder.onnx",
    "decoder_model.onnx",
    "decoder_with_past_model.onnx",
    "encodec_decode.onnx",
];

/// Optional files; the loader falls back to built-in defaults without them.
pub const OPTIONAL_MODEL_FILES: &[&str] = &["config.json"];

/// HuggingFace URLs for musicgen-small (fp16 graphs).
pub const MODEL_URLS: &[(&str, &str)] = &[
    (
        "config.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/config.json",
    ),
    (
        "tokenizer.json",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small/tokenizer.json",
    ),
    (
        "text_encoder.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/text_encoder.onnx",
    ),
    (
        "decoder_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_model.onnx",
    ),
    (
        "decoder_with_past_model.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/decoder_with_past_model.onnx",
    ),
    (
        "encodec_decode.onnx",
        "https://huggingface.co/gabotechs/music_gen/resolve/main/small_fp16/encodec_decode.onnx",
    ),
];

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Required files missing from `model_dir`.
pub fn missing_files(model_dir: &Path) -> Vec<&'static str> {
    REQUIRED_MODEL_FILES
        .iter()
        .copied()
        .filter(|file| !model_dir.join(file).exists())
        .collect()
}

/// Checks if all required model files exist in the directory.
pub fn check_models(model_dir: &Path) -> Result<()> {
    let missing = missing_files(model_dir);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GenError::new(
            ErrorCode::ModelNotFound,
            format!(
                "Missing model files in {}: {}",
                model_dir.display(),
                missing.join(", ")
            ),
        ))
    }
}

fn url_for(file: &str) -> Option<&'static str> {
    MODEL_URLS
        .iter()
        .find(|(name, _)| *name == file)
        .map(|(_, url)| *url)
}

/// Downloads all required model files that are not present.
///
/// Optional files are fetched on a best-effort basis.
pub fn ensure_models(model_dir: &Path) -> Result<()> {
    fs::create_dir_all(model_dir).map_err(|e| {
        GenError::model_download_failed(format!(
            "Failed to create model directory {}: {}",
            model_dir.display(),
            e
        ))
    })?;

    let missing = missing_files(model_dir);
    if missing.is_empty() {
        tracing::debug!(dir = %model_dir.display(), "all model files present");
        return Ok(());
    }

    tracing::info!(
        count = missing.len(),
        dir = %model_dir.display(),
        "downloading missing model files (this may take several minutes)"
    );

    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| {
            GenError::model_download_failed(format!("Failed to create HTTP client: {}", e))
        })?;

    for file in missing {
        let url = url_for(file).ok_or_else(|| {
            GenError::model_download_failed(format!("No download URL for {}", file))
        })?;
        download_file(&client, url, &model_dir.join(file))?;
    }

    for file in OPTIONAL_MODEL_FILES {
        let dest = model_dir.join(file);
        if dest.exists() {
            continue;
        }
        if let Some(url) = url_for(file) {
            if let Err(e) = download_file(&client, url, &dest) {
                tracing::warn!(file = *file, error = %e, "optional model file not downloaded");
            }
        }
    }

    tracing::info!("model download complete");
    Ok(())
}

fn download_file(client: &reqwest::blocking::Client, url: &str, dest: &Path) -> Result<()> {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(file = %name, "downloading");

    let response = client.get(url).send().map_err(|e| {
        GenError::model_download_failed(format!("Failed to download {}: {}", url, e))
    })?;

    if !response.status().is_success() {
        return Err(GenError::model_download_failed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let total = response.content_length();
    let partial = dest.with_extension("part");
    let written = match stream_to_file(response, &partial, total, &name) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&partial);
            return Err(GenError::model_download_failed(format!(
                "Failed to write {}: {}",
                name, e
            )));
        }
    };

    fs::rename(&partial, dest).map_err(|e| {
        GenError::model_download_failed(format!("Failed to move {} into place: {}", name, e))
    })?;

    tracing::info!(
        file = %name,
        size_mb = format_args!("{:.1}", written as f64 / (1024.0 * 1024.0)),
        "downloaded"
    );
    Ok(())
}

fn stream_to_file(
    mut body: impl Read,
    path: &Path,
    total: Option<u64>,
    name: &str,
) -> io::Result<u64> {
    let mut file = io::BufWriter::new(fs::File::create(path)?);
    let mut buffer = [0u8; 64 * 1024];
    let mut downloaded: u64 = 0;
    let mut last_progress = 0;

    loop {
        let n = body.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        downloaded += n as u64;

        if let Some(total) = total.filter(|t| *t > 0) {
            let progress = downloaded * 100 / total;
            if progress >= last_progress + 10 {
                tracing::debug!(file = %name, progress, "download progress");
                last_progress = progress;
            }
        }
    }

    file.flush()?;
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn every_required_file_has_url() {
        for file in REQUIRED_MODEL_FILES {
            assert!(url_for(file).is_some(), "Missing URL for required file: {}", file);
        }
    }

    #[test]
    fn check_models_lists_missing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let err = check_models(dir.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelNotFound);
        assert!(err.message.contains("text_encoder.onnx"));
        assert!(!err.message.contains("tokenizer.json"));
    }

    #[test]
    fn check_models_accepts_complete_dir() {
        let dir = tempdir().unwrap();
        for file in REQUIRED_MODEL_FILES {
            fs::write(dir.path().join(file), b"").unwrap();
        }
        assert!(check_models(dir.path()).is_ok());
        assert!(ensure_models(dir.path()).is_ok());
    }

    #[test]
    fn stream_writes_all_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.part");
        let data = vec![7u8; 200_000];

        let n = stream_to_file(&data[..], &path, Some(data.len() as u64), "blob").unwrap();
        assert_eq!(n, 200_000);
        assert_eq!(fs::read(&path).unwrap(), data);
    }
}
