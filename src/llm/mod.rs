//! Response generation for Prompt Nurse.
//!
//! Supports:
//! - **Stub**: deterministic canned replies, no network
//! - **OpenAI**: direct API access via rig-core
//!
//! rig-core provides the HTTP transport; `RigAdapter` bridges rig's
//! `CompletionModel` trait to our `ResponseGenerator` trait. The pipeline
//! only sees the `ResponseGenerator` trait: sanitized text in,
//! reply text plus optional metadata out.

pub mod openai;
mod rig_adapter;
pub mod stub;

pub use rig_adapter::RigAdapter;
pub use stub::StubGenerator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, LlmError};

/// Token usage reported by a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Provenance of a generated reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Provider request id.
    pub id: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// Output of a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub metadata: Option<GenerationMetadata>,
}

impl Generation {
    /// Generation with no metadata (stub replies).
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
        }
    }
}

/// Produces reply text for a sanitized student message.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Generate a reply. Errors propagate to the caller unretried.
    async fn generate(&self, text: &str) -> Result<Generation, LlmError>;
}

/// Supported generator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    Stub,
    OpenAi,
}

impl GeneratorBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::InvalidValue {
                key: "NURSE_GENERATOR".to_string(),
                message: format!("unknown generator '{other}' (expected 'stub' or 'openai')"),
            }),
        }
    }
}

/// Configuration for creating a response generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
    pub base_url: String,
    /// Upper bound on a single generation request.
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Stub,
            api_key: None,
            model: openai::DEFAULT_MODEL.to_string(),
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Create a response generator from configuration.
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn ResponseGenerator>, Error> {
    match config.backend {
        GeneratorBackend::Stub => {
            tracing::info!("Using deterministic stub generator");
            Ok(Arc::new(StubGenerator::new()))
        }
        GeneratorBackend::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;
            let generator = openai::create_openai_generator(
                &api_key,
                &config.model,
                &config.base_url,
                config.timeout,
            )?;
            Ok(generator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend_names() {
        assert_eq!(GeneratorBackend::parse("stub").unwrap(), GeneratorBackend::Stub);
        assert_eq!(GeneratorBackend::parse(" OpenAI ").unwrap(), GeneratorBackend::OpenAi);
        assert!(GeneratorBackend::parse("claude").is_err());
    }

    #[test]
    fn create_stub_generator() {
        let generator = create_generator(&GeneratorConfig::default()).unwrap();
        assert_eq!(generator.name(), "stub");
    }

    #[test]
    fn create_openai_without_key_fails() {
        let config = GeneratorConfig {
            backend: GeneratorBackend::OpenAi,
            ..GeneratorConfig::default()
        };
        let err = create_generator(&config).err().unwrap();
        assert!(matches!(err, Error::Config(ConfigError::MissingEnvVar(_))));
    }

    #[test]
    fn create_openai_with_key_constructs() {
        // The key is only checked by the provider on the first request.
        let config = GeneratorConfig {
            backend: GeneratorBackend::OpenAi,
            api_key: Some(secrecy::SecretString::from("sk-test")),
            ..GeneratorConfig::default()
        };
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.name(), "openai");
    }
}
