use anyhow::{Context, Result};
use pdfchunk::{api, config, logging, processing::PdfService};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing(logging::ConsoleOutput::Stdout);

    let config = config::get_config();
    let service = PdfService::from_config(config).context("failed to build PDF service")?;
    service
        .ensure_directories()
        .await
        .context("failed to create working directories")?;
    let app = api::create_router(Arc::new(service));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;
    tracing::info!(
        server = %config.server_name,
        "Listening on http://0.0.0.0:{}",
        config.server_port
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
