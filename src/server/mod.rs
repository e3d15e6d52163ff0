//! HTTP server hosting the analysis endpoint.
//!
//! | Route               | Auth   | Response                      |
//! |---------------------|--------|-------------------------------|
//! | `GET /health`       | none   | `{"status":"ok","version":…}` |
//! | `POST /analyzeTask` | bearer | suggestion JSON               |

pub mod auth;
pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::routing::{get, post};
use axum::Router;

use crate::analysis::BoxedProvider;
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Mutex<SqliteStorage>>,
    provider: Arc<BoxedProvider>,
}

impl AppState {
    #[must_use]
    pub fn new(storage: SqliteStorage, provider: BoxedProvider) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            provider: Arc::new(provider),
        }
    }

    /// Lock the store. Never hold the guard across an `.await`.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous holder panicked.
    pub fn storage(&self) -> Result<MutexGuard<'_, SqliteStorage>> {
        self.storage
            .lock()
            .map_err(|_| Error::Other("storage lock poisoned".into()))
    }

    #[must_use]
    pub fn provider(&self) -> &BoxedProvider {
        &self.provider
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/analyzeTask", post(handlers::analyze_task))
        .with_state(state)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address can't be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, provider = state.provider().name(), "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
