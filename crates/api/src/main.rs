use anyhow::Context;

use agrichain_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    agrichain_observability::init(config.log_format);

    if config.genesis.is_empty() {
        tracing::warn!("AGRICHAIN_GENESIS not set; every account starts empty");
    }

    let app = agrichain_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        online_window_secs = config.sensors.online_window.num_seconds(),
        history_limit = config.sensors.history_limit,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
