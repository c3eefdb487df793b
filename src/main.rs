mod error;
mod handlers;
mod middleware;
mod models;
mod routes;

use std::net::SocketAddr;

use models::{AppConfig, AppState};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cms_oauth_relay=debug,tower_http=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let app_config = AppConfig::from_env().inspect_err(|e| {
        error!(error = %e, "invalid configuration, refusing to start");
    })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let origins = app_config.allowed_origins.join(", ");
    let provider = app_config.provider.clone();

    let app_state = AppState::new(app_config)?;
    let app = routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, %provider, %origins, "CMS OAuth relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM. The SIGTERM handler is installed
/// when this is called, not when the future is first polled.
fn shutdown_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let mut sigterm = {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .inspect_err(|e| error!(error = %e, "failed to install SIGTERM handler"))
            .ok()
    };

    async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        {
            let terminate = async {
                match sigterm.as_mut() {
                    Some(sigterm) => {
                        sigterm.recv().await;
                    }
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = ctrl_c => {},
                _ = terminate => {},
            }
        }

        #[cfg(not(unix))]
        ctrl_c.await;

        info!("shutdown signal received, draining in-flight requests");
    }
}
