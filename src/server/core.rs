use axum::Router;
use log::{error, info};
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::middleware::gate_from_config;
use crate::protocol::router;
use crate::service::WorkspaceService;

pub struct Server {
    listener: TcpListener,
    router: Router,
    config: ServerConfig,
}

impl Server {
    /// Opens the workspace root, builds the router and binds the listener.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let service = WorkspaceService::from_config(&config)?;
        let router = router(service, gate_from_config(&config));

        let address = config.listen_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => {
                info!("Server bound to {}", address);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", address, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            listener,
            router,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until Ctrl-C or SIGTERM.
    pub async fn start(self) -> Result<(), ServerError> {
        info!(
            "Starting workspace file server on {} (root: {}, max upload {} MiB, auth: {})",
            self.local_addr()?,
            self.config.workspace_root,
            self.config.max_file_size_mb,
            if self.config.api_token.is_some() { "bearer token" } else { "open" }
        );

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
