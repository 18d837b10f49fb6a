use crate::services::payload::PayloadError;
use crate::services::providers::ProviderError;
use crate::services::upload::UploadError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Any failure while serving a generation request.
///
/// Every variant is reported to the caller the same way: status 500 and
/// `{"error": <message>}`.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Generation request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
