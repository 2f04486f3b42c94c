use std::sync::Arc;

use pagebridge::config::AppConfig;
use pagebridge::routes;
use pagebridge::ssr::{LocalSsr, ssr_router};
use pagebridge::state::{AppState, StartupError};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "pagebridge failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    let port = config.port;
    let ssr_port = config.ssr_server_port;
    let state = AppState::from_config(config)?;

    // Optional standalone SSR endpoint backed by the same registry.
    if let Some(ssr_port) = ssr_port {
        let engine = LocalSsr::new(Arc::clone(state.inertia.registry()));
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{ssr_port}")).await?;
        tracing::info!(port = ssr_port, "ssr endpoint listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, ssr_router(engine)).await {
                tracing::error!(error = %e, "ssr endpoint stopped");
            }
        });
    }

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(%port, "pagebridge listening");
    axum::serve(listener, app).await?;
    Ok(())
}
