//! Frontend proxy entrypoint.
//!
//! Serves the upload page and relays requests to the back end configured through `BACKEND_URL`.
use anyhow::{Context, Result};
use pdfchunk::{
    config, logging,
    frontend::{FrontendState, create_frontend_router},
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing(logging::ConsoleOutput::Stdout);

    let config = config::get_config();
    let state = FrontendState::new(config.backend_url.clone(), config.frontend_port)
        .context("failed to build back-end client")?
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = create_frontend_router(Arc::new(state));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.frontend_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.frontend_port))?;
    tracing::info!(
        backend = %config.backend_url,
        "Frontend listening on http://0.0.0.0:{}",
        config.frontend_port
    );
    axum::serve(listener, app).await.context("frontend error")?;
    Ok(())
}
