//! HTTP transport for the triage pipeline.

pub mod routes;

pub use routes::{AppState, api_routes};

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::ServiceConfig;
use crate::error::{ConfigError, Result};
use crate::llm::create_generator;
use crate::pipeline::{ResponseCache, RulesEngine, TriagePipeline};
use crate::uploads::UploadStore;

/// CORS policy: credentials allowed, request headers mirrored.
///
/// With no configured origins the request origin is echoed back; otherwise
/// only the listed origins are allowed.
pub fn cors_layer(origins: &[String]) -> std::result::Result<CorsLayer, ConfigError> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let values = origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>().map_err(|e| ConfigError::InvalidValue {
                    key: "NURSE_CORS_ORIGINS".to_string(),
                    message: format!("{o}: {e}"),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Wire the pipeline, upload store and routes from configuration.
pub async fn build_app(config: &ServiceConfig) -> Result<Router> {
    let rules = match &config.patterns_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading triage patterns");
            RulesEngine::load(path)?
        }
        None => RulesEngine::default_rules(),
    };

    let cache = ResponseCache::new(config.cache_capacity);
    let generator = create_generator(&config.generator)?;
    let pipeline = TriagePipeline::new(
        Arc::new(rules),
        Arc::new(cache),
        generator,
        config.pipeline_settings(),
    );

    let uploads = UploadStore::new(config.upload_dir.clone());
    uploads.ensure_dir().await?;

    let state = AppState {
        pipeline: Arc::new(pipeline),
        uploads: Arc::new(uploads),
    };
    Ok(api_routes(state, cors_layer(&config.cors_origins)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_valid_origins() {
        assert!(cors_layer(&[]).is_ok());
        assert!(cors_layer(&["http://localhost:3000".to_string()]).is_ok());
    }

    #[test]
    fn cors_rejects_unencodable_origin() {
        let err = cors_layer(&["http://bad\norigin".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn build_app_creates_upload_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ServiceConfig {
            upload_dir: dir.path().join("nested").join("uploads"),
            ..ServiceConfig::default()
        };
        let _app = build_app(&config).await.unwrap();
        assert!(config.upload_dir.is_dir());
    }

    #[tokio::test]
    async fn build_app_surfaces_bad_pattern_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let patterns = dir.path().join("patterns.json");
        std::fs::write(&patterns, "not json").unwrap();
        let config = ServiceConfig {
            upload_dir: dir.path().join("uploads"),
            patterns_path: Some(patterns),
            ..ServiceConfig::default()
        };
        assert!(build_app(&config).await.is_err());
    }
}
