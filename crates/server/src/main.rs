use anyhow::Context;
use db::DBService;
use server::{AppState, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let db = DBService::new(&config.database_url)
        .await
        .context("failed to open database")?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, db).context("failed to build app state")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "pagesmith server listening");

    axum::serve(listener, server::router(state)).await?;
    Ok(())
}
