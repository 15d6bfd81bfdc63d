use std::sync::Arc;

use anyhow::Result;
use tablecall_http::{AppState, create_router};

pub(crate) async fn run(port: u16, host: String) -> Result<()> {
    let transports = super::connect().await?;
    let state = Arc::new(AppState::new(
        transports.store,
        transports.channel,
        transports.config.await_durable_write,
    ));

    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
