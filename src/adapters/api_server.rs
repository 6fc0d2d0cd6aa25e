use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::error::Result;

/// Start the API server; returns once the shutdown signal fires
pub async fn start_api_server(
    state: AppState,
    port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    info!("API server stopped");
    Ok(())
}

/// Start the API server in the background
pub fn start_api_server_background(
    state: AppState,
    port: u16,
    shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move { start_api_server(state, port, shutdown_rx).await })
}
