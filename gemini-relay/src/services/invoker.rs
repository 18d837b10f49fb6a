//! Single-call model invocation.

use crate::services::metrics;
use crate::services::payload::ModelPart;
use crate::services::providers::{FinishReason, GenerativeModel, ProviderError};
use std::sync::Arc;
use std::time::Instant;

/// Normalized outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub output_text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

/// Sends parts to the configured model and flattens its reply.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct ModelInvoker {
    model: Arc<dyn GenerativeModel>,
}

impl ModelInvoker {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn GenerativeModel {
        self.model.as_ref()
    }

    /// Perform exactly one remote call. No retries.
    pub async fn invoke(&self, parts: &[ModelPart]) -> Result<GenerationResult, ProviderError> {
        let provider = self.model.provider();
        let model = self.model.model();
        let start = Instant::now();

        let outcome = self
            .model
            .generate_content(parts)
            .await
            .and_then(|response| {
                let shape = response.shape();
                response.into_content().inspect_err(|_| {
                    tracing::warn!(provider, model, shape, "Model reply had no usable result");
                })
            });

        metrics::record_provider_latency(provider, model, start.elapsed().as_secs_f64());

        match outcome {
            Ok(content) => {
                tracing::info!(
                    provider,
                    model,
                    input_tokens = content.input_tokens,
                    output_tokens = content.output_tokens,
                    finish_reason = content.finish_reason.as_str(),
                    "Generation completed"
                );
                Ok(GenerationResult {
                    output_text: content.text,
                    input_tokens: content.input_tokens,
                    output_tokens: content.output_tokens,
                    finish_reason: content.finish_reason,
                })
            }
            Err(e) => {
                metrics::record_provider_error(provider, e.kind());
                tracing::error!(provider, model, error = %e, "Generation failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::{MockModel, MockReply};

    #[tokio::test]
    async fn direct_and_nested_replies_give_same_result() {
        for reply in [
            MockReply::Text("Hi there".to_string()),
            MockReply::NestedText("Hi there".to_string()),
        ] {
            let invoker = ModelInvoker::new(Arc::new(MockModel::new(reply)));

            let result = invoker.invoke(&[ModelPart::text("Say hi")]).await.unwrap();

            assert_eq!(result.output_text, "Hi there");
            assert_eq!(result.finish_reason, FinishReason::Complete);
        }
    }

    #[tokio::test]
    async fn unrecognized_reply_is_invalid_response() {
        let invoker = ModelInvoker::new(Arc::new(MockModel::new(MockReply::Unrecognized)));

        let err = invoker.invoke(&[ModelPart::text("x")]).await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid response from Gemini API");
    }

    #[tokio::test]
    async fn parts_are_forwarded_in_order_once() {
        let model = Arc::new(MockModel::replying("ok"));
        let invoker = ModelInvoker::new(model.clone());
        let parts = vec![
            ModelPart::text("describe"),
            ModelPart::inline("image/png", b"png"),
        ];

        invoker.invoke(&parts).await.unwrap();

        assert_eq!(model.calls(), vec![parts]);
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let invoker = ModelInvoker::new(Arc::new(MockModel::failing("quota exhausted")));

        let err = invoker.invoke(&[ModelPart::text("x")]).await.unwrap_err();

        assert!(err.to_string().contains("quota exhausted"));
    }
}
