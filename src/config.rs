//! Configuration types.
//!
//! Everything is read from environment variables at startup; see
//! [`ServiceConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::llm::{GeneratorBackend, GeneratorConfig, openai};
use crate::pipeline::PipelineSettings;
use crate::pipeline::sanitize::DEFAULT_MAX_CHARS;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    pub port: u16,
    /// Directory for uploaded documents.
    pub upload_dir: PathBuf,
    /// Character budget for text sent to the generator.
    pub max_chars: usize,
    /// Response cache capacity (`None` = unbounded).
    pub cache_capacity: Option<usize>,
    /// Allowed CORS origins. Empty = mirror the request origin.
    pub cors_origins: Vec<String>,
    /// Optional JSON file overriding the built-in pattern table.
    pub patterns_path: Option<PathBuf>,
    pub crisis_overrides_irrelevant: bool,
    pub generator: GeneratorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./uploads"),
            max_chars: DEFAULT_MAX_CHARS,
            cache_capacity: None,
            cors_origins: Vec::new(),
            patterns_path: None,
            crisis_overrides_irrelevant: false,
            generator: GeneratorConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = parse_or(&var, "NURSE_PORT", defaults.port);
        let max_chars = parse_or(&var, "NURSE_MAX_CHARS", defaults.max_chars);
        let cache_capacity = var("NURSE_CACHE_CAPACITY").and_then(|v| match v.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(value = %v, "Ignoring invalid NURSE_CACHE_CAPACITY, cache is unbounded");
                None
            }
        });

        let cors_origins: Vec<String> = var("NURSE_CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let crisis_overrides_irrelevant = match var("NURSE_CRISIS_OVERRIDES_IRRELEVANT") {
            Some(v) => parse_bool("NURSE_CRISIS_OVERRIDES_IRRELEVANT", &v)?,
            None => defaults.crisis_overrides_irrelevant,
        };

        let api_key = var("OPENAI_API_KEY").map(secrecy::SecretString::from);
        let backend = match var("NURSE_GENERATOR") {
            Some(v) => GeneratorBackend::parse(&v)?,
            None if api_key.is_some() => GeneratorBackend::OpenAi,
            None => GeneratorBackend::Stub,
        };
        if backend == GeneratorBackend::OpenAi && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()));
        }

        let timeout_secs = parse_or(
            &var,
            "NURSE_LLM_TIMEOUT_SECS",
            defaults.generator.timeout.as_secs(),
        );

        let generator = GeneratorConfig {
            backend,
            api_key,
            model: var("NURSE_MODEL").unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            base_url: var("NURSE_OPENAI_BASE_URL")
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            bind_addr: var("NURSE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            upload_dir: var("NURSE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_chars,
            cache_capacity,
            cors_origins,
            patterns_path: var("NURSE_PATTERNS_PATH").map(PathBuf::from),
            crisis_overrides_irrelevant,
            generator,
        })
    }

    /// Pipeline tunables derived from this configuration.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_chars: self.max_chars,
            crisis_overrides_irrelevant: self.crisis_overrides_irrelevant,
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T, F>(var: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!(key, value = %v, fallback = %default, "Ignoring invalid config value");
            default
        }),
        None => default,
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_chars, 500);
        assert!(config.cache_capacity.is_none());
        assert!(config.cors_origins.is_empty());
        assert!(!config.crisis_overrides_irrelevant);
        assert_eq!(config.generator.backend, GeneratorBackend::Stub);
        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn api_key_selects_openai() {
        let config = load(&[("OPENAI_API_KEY", "sk-abc")]).unwrap();
        assert_eq!(config.generator.backend, GeneratorBackend::OpenAi);
        assert_eq!(config.generator.model, "gpt-3.5-turbo");
    }

    #[test]
    fn explicit_stub_wins_over_api_key() {
        let config = load(&[("OPENAI_API_KEY", "sk-abc"), ("NURSE_GENERATOR", "stub")]).unwrap();
        assert_eq!(config.generator.backend, GeneratorBackend::Stub);
    }

    #[test]
    fn openai_without_key_is_an_error() {
        let err = load(&[("NURSE_GENERATOR", "openai")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn parses_overrides() {
        let config = load(&[
            ("NURSE_PORT", "9001"),
            ("NURSE_MAX_CHARS", "120"),
            ("NURSE_CACHE_CAPACITY", "64"),
            ("NURSE_CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("NURSE_CRISIS_OVERRIDES_IRRELEVANT", "true"),
            ("NURSE_LLM_TIMEOUT_SECS", "5"),
            ("NURSE_UPLOAD_DIR", "/tmp/up"),
        ])
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.max_chars, 120);
        assert_eq!(config.cache_capacity, Some(64));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.crisis_overrides_irrelevant);
        assert_eq!(config.generator.timeout, Duration::from_secs(5));
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/up"));

        let settings = config.pipeline_settings();
        assert_eq!(settings.max_chars, 120);
        assert!(settings.crisis_overrides_irrelevant);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let config = load(&[("NURSE_PORT", "eighty"), ("NURSE_CACHE_CAPACITY", "-1")]).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.cache_capacity.is_none());
    }

    #[test]
    fn malformed_bool_is_an_error() {
        let err = load(&[("NURSE_CRISIS_OVERRIDES_IRRELEVANT", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_generator_is_an_error() {
        assert!(load(&[("NURSE_GENERATOR", "gpt2-local")]).is_err());
    }
}
