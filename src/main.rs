use anyhow::Context;

use prompt_nurse::api::build_app;
use prompt_nurse::config::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;

    eprintln!("🩺 Illini Prompt Nurse v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Generator: {:?} (model: {})", config.generator.backend, config.generator.model);
    eprintln!("   Uploads: {}", config.upload_dir.display());
    eprintln!(
        "   Cache: {}",
        config
            .cache_capacity
            .map(|n| format!("{n} entries"))
            .unwrap_or_else(|| "unbounded".to_string())
    );
    eprintln!("   API: http://{}/message\n", config.listen_addr());

    let app = build_app(&config).await.context("failed to build service")?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;
    tracing::info!(addr = %config.listen_addr(), "Prompt Nurse API started");

    axum::serve(listener, app).await?;
    Ok(())
}
