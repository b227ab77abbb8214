use std::net::{Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};
use preview_sync_core::config::Config;
use preview_sync_web::{AppState, app};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        root = %config.output.root.display(),
        path = %config.server.webhook_path,
        "Loaded configuration"
    );
    let port = config.server.port;
    let state = AppState::new(config).context("Failed to create application state")?;
    let router = app(state);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;
    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let result = {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                result = signal::ctrl_c() => result,
                _ = sigterm.recv() => Ok(()),
            },
            Err(e) => Err(e),
        }
    };
    #[cfg(not(unix))]
    let result = signal::ctrl_c().await;
    if let Err(e) = result {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
