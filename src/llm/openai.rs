//! OpenAI generator built on rig's OpenAI client.
//!
//! Sends the sanitized message as a single user turn. rig handles the
//! transport; `RigAdapter` maps the reply, metadata and errors.

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use rig::providers::openai;
use secrecy::{ExposeSecret, SecretString};

use super::{ResponseGenerator, RigAdapter};
use crate::error::LlmError;

/// Default API base.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const PROVIDER: &str = "openai";

/// Create an OpenAI-backed generator.
///
/// The key is not checked here; a bad key surfaces as `AuthFailed` on the
/// first request.
pub fn create_openai_generator(
    api_key: &SecretString,
    model: &str,
    base_url: &str,
    timeout: Duration,
) -> Result<Arc<dyn ResponseGenerator>, LlmError> {
    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::builder()
            .api_key(api_key.expose_secret())
            .base_url(base_url)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to create OpenAI client: {e}"),
            })?;

    let completion_model = client.completion_model(model);
    tracing::info!("Using OpenAI (model: {model}, base: {base_url})");
    Ok(Arc::new(RigAdapter::new(
        completion_model,
        PROVIDER,
        model,
        timeout,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Serve `router` on a random local port and return its `/v1` base.
    async fn mock_server(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://127.0.0.1:{port}/v1")
    }

    fn generator(base_url: &str) -> Arc<dyn ResponseGenerator> {
        create_openai_generator(
            &SecretString::from("sk-test"),
            DEFAULT_MODEL,
            base_url,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn constructs_without_network() {
        assert_eq!(generator(DEFAULT_BASE_URL).name(), PROVIDER);
    }

    #[tokio::test]
    async fn rejected_key_maps_to_auth_failed() {
        let rejected = || async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "code": "invalid_api_key"
                }})),
            )
        };
        let router = Router::new()
            .route("/v1/responses", post(rejected))
            .route("/v1/chat/completions", post(rejected));
        let base = mock_server(router).await;

        let err = generator(&base).generate("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_request_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = generator(&format!("http://127.0.0.1:{port}/v1"))
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RequestFailed { .. }), "got {err:?}");
    }
}
