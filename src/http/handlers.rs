use axum::{body::Bytes, extract::State, response::Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::audio::write_unique_wav;
use crate::generator::GeneratorMode;
use crate::synth::reference_tone;
use crate::types::GenerationRequest;

use super::error::HttpError;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_loaded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    duration: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub wav_path: String,
    pub prompt: String,
    pub duration: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct TestToneResponse {
    pub wav_path: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = match state.generator.mode() {
        GeneratorMode::Model => HealthResponse {
            status: "ok",
            model_loaded: Some(state.generator.is_ready()),
            mode: None,
        },
        GeneratorMode::Test => HealthResponse {
            status: "ok",
            model_loaded: None,
            mode: Some(GeneratorMode::Test.as_str()),
        },
    };
    Json(response)
}

/// Parses the raw body so empty or malformed JSON gets the same error shape
/// as every other failure.
fn parse_body(body: &[u8]) -> Result<GenerateBody, HttpError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| HttpError::bad_request("No JSON data provided"))?;

    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(HttpError::bad_request("No JSON data provided")),
    }

    serde_json::from_value(value)
        .map_err(|e| HttpError::bad_request(format!("Invalid request: {}", e)))
}

pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, HttpError> {
    let body = parse_body(&body)?;
    let request = GenerationRequest::new(body.prompt.unwrap_or_default(), body.duration)
        .map_err(|e| {
            tracing::warn!(error = %e.message, "rejected generate request");
            HttpError::from(e)
        })?
        .clamp_duration(state.max_duration_sec);

    tracing::info!(
        prompt = %request.prompt,
        duration_sec = request.duration_sec,
        "received generate request"
    );

    let generator = state.generator.clone();
    let job = request.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&job.prompt, job.duration_sec))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "generation task panicked");
            HttpError::internal(format!("Generation task failed: {}", e))
        })?;

    match result {
        Ok(clip) => {
            tracing::info!(path = %clip.path.display(), "generate request completed");
            Ok(Json(GenerateResponse {
                wav_path: clip.path_string(),
                prompt: request.prompt,
                duration: request.duration_sec,
                mode: match state.generator.mode() {
                    GeneratorMode::Test => Some(GeneratorMode::Test.as_str()),
                    GeneratorMode::Model => None,
                },
            }))
        }
        Err(error) => {
            tracing::error!(code = %error.code, error = %error, "generate request failed");
            Err(HttpError::from(error))
        }
    }
}

pub async fn test_tone(State(state): State<AppState>) -> Result<Json<TestToneResponse>, HttpError> {
    let output_dir = state.output_dir.clone();
    let path = tokio::task::spawn_blocking(move || write_unique_wav(&reference_tone(), &output_dir))
        .await
        .map_err(|e| HttpError::internal(format!("Test tone task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %e, "test tone failed");
            HttpError::from(e)
        })?;

    tracing::info!(path = %path.display(), "wrote test tone");
    Ok(Json(TestToneResponse {
        wav_path: path.to_string_lossy().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_parsing() {
        let body = parse_body(br#"{"prompt": "bell", "duration": 1.5}"#).unwrap();
        assert_eq!(body.prompt.as_deref(), Some("bell"));
        assert_eq!(body.duration, Some(1.5));

        let body = parse_body(br#"{"prompt": "bell"}"#).unwrap();
        assert_eq!(body.duration, None);
    }

    #[test]
    fn empty_or_non_object_bodies_are_rejected() {
        let bodies: [&[u8]; 5] = [b"", b"{}", b"null", b"[1, 2]", b"not json"];
        for raw in bodies {
            let err = parse_body(raw).unwrap_err();
            assert!(matches!(err, HttpError::BadRequest { .. }), "{:?}", raw);
        }
    }

    #[test]
    fn wrongly_typed_fields_are_rejected() {
        let err = parse_body(br#"{"prompt": "bell", "duration": "long"}"#).unwrap_err();
        assert!(matches!(err, HttpError::BadRequest { .. }));
    }
}
