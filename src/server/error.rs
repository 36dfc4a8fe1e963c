//! HTTP error type rendered as `{ "error": …, "details": … }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input; 400 with `error` only.
    #[error("{0}")]
    BadRequest(String),

    /// An operation failed; 500 with a fixed summary and the cause.
    #[error("{error}: {details}")]
    Failed { error: &'static str, details: String },

    /// The operation reported success but its output is unusable; 500.
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// `map_err` adapter: `.map_err(ApiError::failed("Transcription failed"))`.
    pub fn failed<E: std::fmt::Display>(error: &'static str) -> impl FnOnce(E) -> ApiError {
        move |cause| ApiError::Failed {
            error,
            details: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Failed { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(message) => serde_json::json!({ "error": message }),
            ApiError::Failed { error, details } => {
                log::error!("server: {error}: {details}");
                serde_json::json!({ "error": error, "details": details })
            }
            ApiError::Internal(error) => {
                log::error!("server: {error}");
                serde_json::json!({ "error": error })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal("Audio generation failed").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn failed_adapter_keeps_cause() {
        let err: Result<(), _> = Err("disk full").map_err(ApiError::failed("TTS failed"));
        match err.unwrap_err() {
            ApiError::Failed { error, details } => {
                assert_eq!(error, "TTS failed");
                assert_eq!(details, "disk full");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn into_response_uses_status() {
        let response = ApiError::bad_request("No text provided").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
