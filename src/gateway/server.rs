//! Gateway server

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::config::Config;
use crate::{Error, Result};

/// MCP Authgate server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// State shared by every request
    state: Arc<AppState>,
}

impl Gateway {
    /// Create a new gateway. The credential set is resolved here, once.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let state = Arc::new(AppState::from_config(&config));
        Self { config, state }
    }

    /// Shared state handed to the router
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<()> {
        let bind = self.config.bind_address();
        let listener = TcpListener::bind((self.config.server.host.as_str(), self.config.server.port))
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {bind}: {e}")))?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// After `shutdown` fires, in-flight requests get
    /// `server.shutdown_timeout` to finish before they are dropped.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.log_banner(addr);

        let (stopping_tx, mut stopping_rx) = watch::channel(false);
        let signal = async move {
            shutdown.await;
            info!("Shutdown signal received");
            let _ = stopping_tx.send(true);
        };

        let app = create_router(Arc::clone(&self.state));
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(server);

        let drain_timeout = self.config.server.shutdown_timeout;
        let drain_deadline = async move {
            let signalled = stopping_rx.wait_for(|stopping| *stopping).await.is_ok();
            if !signalled {
                // Sender dropped without signalling: the server ended on its own
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(drain_timeout).await;
        };

        tokio::select! {
            result = &mut server => {
                result.map_err(|e| Error::Internal(e.to_string()))?;
            }
            () = drain_deadline => {
                warn!(timeout = ?drain_timeout, "Shutdown timeout elapsed, dropping in-flight requests");
            }
        }

        info!("Server stopped");
        Ok(())
    }

    fn log_banner(&self, addr: SocketAddr) {
        info!("============================================================");
        info!("MCP AUTHGATE v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, addr = %addr, "Listening");

        let keys = self.state.credentials.len();
        if keys > 0 {
            info!(keys, "AUTHORIZATION enabled with {keys} authorized key(s)");
        } else {
            warn!("AUTHORIZATION disabled - no keys configured, all requests will be allowed");
        }

        info!("Authorization methods supported:");
        info!("  1. Authorization header: 'Bearer <key>', 'ApiKey <key>' or '<key>'");
        info!("  2. URL parameter fallback: '?key=<key>' or '?auth=<key>'");
        info!("  URL parameters are less secure; use them only where headers are not supported");
        info!("============================================================");
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
