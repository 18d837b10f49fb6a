//! Scripted model for testing.

use super::{GeneratedContent, GenerativeModel, ModelResponse, ProviderError};
use crate::services::payload::ModelPart;
use async_trait::async_trait;
use std::sync::Mutex;

/// What the mock replies with on every call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A direct result carrying this text.
    Text(String),
    /// The same text wrapped in an outer `response` object.
    NestedText(String),
    /// A reply with neither shape.
    Unrecognized,
    /// The call fails with an API error carrying this message.
    Fail(String),
}

/// Mock model that returns a fixed reply and records every call.
pub struct MockModel {
    reply: MockReply,
    calls: Mutex<Vec<Vec<ModelPart>>>,
}

impl MockModel {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockReply::Fail(message.into()))
    }

    /// Parts received by each call so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<ModelPart>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate_content(&self, parts: &[ModelPart]) -> Result<ModelResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(parts.to_vec());
        }

        match &self.reply {
            MockReply::Text(text) => Ok(ModelResponse::Direct(GeneratedContent::text(text))),
            MockReply::NestedText(text) => Ok(ModelResponse::Nested {
                response: GeneratedContent::text(text),
            }),
            MockReply::Unrecognized => Ok(ModelResponse::Unrecognized),
            MockReply::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.reply {
            MockReply::Fail(message) => Err(ProviderError::ApiError(message.clone())),
            _ => Ok(()),
        }
    }
}
