//! Generative model provider abstractions and implementations.
//!
//! Providers hide the remote API behind [`GenerativeModel`], so the relay can
//! swap the Gemini backend for the scripted mock in tests.

pub mod gemini;
pub mod mock;

use crate::services::payload::ModelPart;
use async_trait::async_trait;
use thiserror::Error;

/// Message returned when the model reply carries no recognizable result.
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid response from Gemini API";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("{}", INVALID_RESPONSE_MESSAGE)]
    InvalidResponse,
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::InvalidResponse => "invalid_response",
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("STOP") | None => FinishReason::Complete,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                FinishReason::ContentFilter
            }
            Some(_) => FinishReason::Complete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

/// Generated text plus usage, as extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    pub text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

impl GeneratedContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Complete,
        }
    }
}

/// Shape of a raw model reply.
///
/// Depending on the call path the result either exposes its content directly
/// or wraps it in an outer `response` object. Both shapes carry the same
/// content; [`ModelResponse::into_content`] flattens them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    Direct(GeneratedContent),
    Nested { response: GeneratedContent },
    Unrecognized,
}

impl ModelResponse {
    pub fn into_content(self) -> Result<GeneratedContent, ProviderError> {
        match self {
            ModelResponse::Direct(content) | ModelResponse::Nested { response: content } => {
                Ok(content)
            }
            ModelResponse::Unrecognized => Err(ProviderError::InvalidResponse),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ModelResponse::Direct(_) => "direct",
            ModelResponse::Nested { .. } => "nested",
            ModelResponse::Unrecognized => "unrecognized",
        }
    }
}

/// A remote model that generates content from an ordered list of parts.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider name, used in logs and metrics.
    fn provider(&self) -> &str;

    /// Model identifier, used in logs and metrics.
    fn model(&self) -> &str;

    /// Perform one generation call.
    async fn generate_content(&self, parts: &[ModelPart]) -> Result<ModelResponse, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_shapes_normalize_to_same_content() {
        let content = GeneratedContent::text("Hi there");

        let direct = ModelResponse::Direct(content.clone()).into_content().unwrap();
        let nested = ModelResponse::Nested {
            response: content.clone(),
        }
        .into_content()
        .unwrap();

        assert_eq!(direct, content);
        assert_eq!(nested, content);
    }

    #[test]
    fn unrecognized_shape_is_invalid_response() {
        let err = ModelResponse::Unrecognized.into_content().unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse));
        assert_eq!(err.to_string(), "Invalid response from Gemini API");
    }

    #[test]
    fn error_kinds_and_messages() {
        let cases = [
            (ProviderError::NotConfigured("no key".into()), "not_configured", "no key"),
            (ProviderError::ApiError("bad".into()), "api_error", "bad"),
            (ProviderError::RateLimited("quota".into()), "rate_limited", "quota"),
            (ProviderError::ContentFiltered("SAFETY".into()), "content_filtered", "SAFETY"),
            (ProviderError::NetworkError("refused".into()), "network_error", "refused"),
            (ProviderError::InvalidResponse, "invalid_response", "Invalid response"),
        ];

        for (err, kind, fragment) in cases {
            assert_eq!(err.kind(), kind);
            assert!(err.to_string().contains(fragment), "{err}");
        }
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(FinishReason::from_api(Some("STOP")), FinishReason::Complete);
        assert_eq!(FinishReason::from_api(None), FinishReason::Complete);
        assert_eq!(FinishReason::from_api(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(
            FinishReason::from_api(Some("SAFETY")),
            FinishReason::ContentFilter
        );
    }
}
