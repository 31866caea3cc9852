mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use chatlog_capture::{CaptureConfig, CaptureService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chatlog_server=debug,chatlog_capture=debug,chatlog_db=info,tower_http=debug".into()
            }),
        )
        .init();

    // Config: a JSON document if CHATLOG_CONFIG points at one, else CHATLOG_* variables
    let config = match std::env::var("CHATLOG_CONFIG") {
        Ok(path) => CaptureConfig::from_file(&PathBuf::from(path))?,
        Err(_) => CaptureConfig::from_env()?,
    };
    let host = std::env::var("CHATLOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CHATLOG_PORT")
        .unwrap_or_else(|_| "3300".into())
        .parse()?;

    // A store that cannot be opened is fatal: never accept events without one
    let service = Arc::new(CaptureService::new(config));
    service.initialize().await?;

    let app = routes::router(service.clone());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("chatlog {} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = service.shutdown().await {
        error!("Error during capture shutdown: {}", e);
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
