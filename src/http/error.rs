use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::GenError;

/// Errors returned from handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum HttpError {
    BadRequest { message: String },
    Internal { message: String },
}

impl HttpError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        HttpError::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            HttpError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            HttpError::BadRequest { message } | HttpError::Internal { message } => message,
        };

        (
            status,
            Json(json!({
                "error": message,
            })),
        )
            .into_response()
    }
}

/// Caller mistakes become 400; everything else is a 500.
impl From<GenError> for HttpError {
    fn from(error: GenError) -> Self {
        if error.is_client_error() {
            HttpError::BadRequest {
                message: error.message,
            }
        } else {
            HttpError::Internal {
                message: error.message,
            }
        }
    }
}
