//! Server assembly: state, layers, listener, graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{DbGateway, MySqlGateway};
use crate::http::{cors, routes};

/// Shared application state. Read-only after startup; requests share
/// nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DbGateway>,
    pub cors_origin: HeaderValue,
}

/// Build the full router with CORS and tracing layers applied.
pub fn build_router(state: AppState) -> Router {
    routes::router(state.clone())
        .layer(middleware::from_fn_with_state(state, cors::layer))
        .layer(TraceLayer::new_for_http())
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    let gateway: Arc<dyn DbGateway> = Arc::new(MySqlGateway::new(&config));

    // Startup smoke test over the reader login; failure is logged, not
    // fatal - the database may come up later.
    match gateway.ping().await {
        Ok(()) => tracing::info!("database reachable"),
        Err(err) => tracing::warn!(error = %err, "database smoke test failed"),
    }

    let state = AppState {
        db: gateway,
        cors_origin: config.cors_origin.clone(),
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", addr);
    tracing::info!("POST  /lab5/api/v1/insert");
    tracing::info!("GET   /lab5/api/v1/sql?query=select%20*%20from%20patient");
    tracing::info!("GET   /lab5/api/v1/sql/%22select%20*%20from%20patient%22");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}
