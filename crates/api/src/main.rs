use anyhow::Context;

use quill_api::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            quill_observability::init(&std::env::var("APP_MODE").unwrap_or_default());
            tracing::error!(error = %e, "invalid configuration");
            return Err(e).context("invalid configuration");
        }
    };
    quill_observability::init(&config.mode);

    tracing::info!(mode = %config.mode, prefix = %config.prefix, "starting quill-api");

    let app = quill_api::build_app(&config)
        .await
        .context("failed to build application")?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
