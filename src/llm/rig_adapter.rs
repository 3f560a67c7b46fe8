//! Adapter from rig's `CompletionModel` to our `ResponseGenerator`.
//!
//! rig owns the HTTP transport and wire types; this module only maps its
//! response into `Generation` and its errors into `LlmError`.

use std::time::Duration;

use async_trait::async_trait;
use rig::OneOrMany;
use rig::completion::message::AssistantContent;
use rig::completion::{CompletionError, CompletionModel, Usage};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Generation, GenerationMetadata, ResponseGenerator, TokenUsage};
use crate::error::LlmError;

/// Longest provider error body carried into an `LlmError`.
const MAX_ERROR_BODY: usize = 200;

/// Bridges a rig completion model to the pipeline's generator seam.
#[derive(Clone)]
pub struct RigAdapter<M> {
    model: M,
    provider: &'static str,
    model_name: String,
    timeout: Duration,
}

impl<M> RigAdapter<M> {
    /// Wrap `model`. Every request is bounded by `timeout`.
    pub fn new(model: M, provider: &'static str, model_name: &str, timeout: Duration) -> Self {
        Self {
            model,
            provider,
            model_name: model_name.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl<M> ResponseGenerator for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
    M::Response: Serialize,
{
    fn name(&self) -> &str {
        self.provider
    }

    async fn generate(&self, text: &str) -> Result<Generation, LlmError> {
        debug!(provider = self.provider, model = %self.model_name, "Sending completion request");

        let request = self.model.completion_request(text).send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| map_completion_error(self.provider, e))?;

        let reply = reply_text(&response.choice).ok_or_else(|| LlmError::InvalidResponse {
            provider: self.provider.to_string(),
            reason: "response contained no text".to_string(),
        })?;

        let metadata = match serde_json::to_value(&response.raw_response) {
            Ok(raw) => metadata_from_raw(&raw, token_usage(&response.usage), &self.model_name),
            Err(e) => {
                warn!(provider = self.provider, error = %e, "Could not read raw provider response");
                None
            }
        };

        Ok(Generation {
            text: reply,
            metadata,
        })
    }
}

/// Join the text parts of a reply, trimmed. `None` when there are none.
fn reply_text(choice: &OneOrMany<AssistantContent>) -> Option<String> {
    let text = choice
        .iter()
        .filter_map(|content| match content {
            AssistantContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn token_usage(usage: &Usage) -> TokenUsage {
    let clamp = |n: u64| u32::try_from(n).unwrap_or(u32::MAX);
    TokenUsage {
        prompt_tokens: clamp(usage.input_tokens),
        completion_tokens: clamp(usage.output_tokens),
        total_tokens: clamp(usage.total_tokens),
    }
}

/// Request id and model from the provider's raw response body.
///
/// Returns `None` when the provider sent no id.
fn metadata_from_raw(
    raw: &Value,
    usage: TokenUsage,
    fallback_model: &str,
) -> Option<GenerationMetadata> {
    let id = raw.get("id")?.as_str()?.to_string();
    let model = raw
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(fallback_model)
        .to_string();
    Some(GenerationMetadata { id, model, usage })
}

fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ProviderError(body) => provider_error(provider, &body),
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        CompletionError::JsonError(e) => LlmError::Json(e),
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Classify an error body returned by the provider.
fn provider_error(provider: &str, body: &str) -> LlmError {
    let lower = body.to_ascii_lowercase();
    if lower.contains("invalid_api_key")
        || lower.contains("incorrect api key")
        || lower.contains("unauthorized")
    {
        return LlmError::AuthFailed {
            provider: provider.to_string(),
        };
    }
    if lower.contains("rate_limit") || lower.contains("rate limit") {
        return LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        };
    }
    let reason: String = body.chars().take(MAX_ERROR_BODY).collect();
    LlmError::RequestFailed {
        provider: provider.to_string(),
        reason,
    }
}
