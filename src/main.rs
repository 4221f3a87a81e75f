//! Workspace file server - Entry Point
//!
//! Sandboxed directory creation, rename, move and upload over HTTP.

use env_logger::Env;
use log::{error, info};
use std::process;

use workspace_fs_server::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default filter
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Launching workspace file server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let server = match Server::new(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        error!("Server terminated with error: {}", e);
        process::exit(1);
    }
}
