use axum::Router;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vigil_dns_api::{create_api_router, AppState};
use vigil_dns_domain::Config;

/// Run the HTTP API until a shutdown signal arrives.
pub async fn serve(
    state: AppState,
    cfg: &Config,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = Router::new().nest("/api", create_api_router(state));

    let addr: SocketAddr = format!("{}:{}", cfg.server.bind_address, cfg.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        bind_address = %addr,
        api_url = format!("http://{addr}/api"),
        "API server listening"
    );

    let signal = async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
                _ = shutdown.cancelled() => {},
            }
        }
        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => {},
                _ = shutdown.cancelled() => {},
            }
        }
        info!("Shutdown signal received");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(signal)
    .await
    .map_err(|e| {
        error!(error = %e, "API server error");
        e
    })?;

    Ok(())
}
