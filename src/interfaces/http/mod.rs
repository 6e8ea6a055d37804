//! HTTP surface over the ledger.

pub mod dto;
pub mod errors;
pub mod handlers;

use crate::application::ledger::BalanceLedger;
use crate::error::Result;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BalanceLedger>,
}

pub fn router(ledger: Arc<BalanceLedger>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/total", get(handlers::total))
        .route("/user/:username/create", get(handlers::create_account))
        .route("/user/:username/balance", get(handlers::get_balance))
        .route("/increase", post(handlers::increase))
        .route("/decrease", post(handlers::decrease))
        .with_state(AppState { ledger })
}

/// Serves the ledger on `addr` until Ctrl-C or SIGTERM, then closes the store.
pub async fn serve(ledger: Arc<BalanceLedger>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(ledger.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    ledger.close().await
}

async fn shutdown_signal() {
    let ctrl_c = interrupt(tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Resolves when `signal` fires. A handler that failed to install never
/// resolves, so it cannot trigger a shutdown on its own.
async fn interrupt(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_interrupt_resolves_when_signal_fires() {
        let fired = interrupt(async { Ok(()) });
        assert!(timeout(Duration::from_millis(100), fired).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_handler_does_not_trigger_shutdown() {
        let failed = interrupt(async {
            Err(std::io::Error::other("signal driver unavailable"))
        });
        assert!(timeout(Duration::from_millis(100), failed).await.is_err());
    }
}
