pub mod config;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod service;
pub mod storage;
pub mod transfer;

pub use config::ServerConfig;
pub use server::Server;
pub use service::WorkspaceService;
