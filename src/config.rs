//! Configuration management for the workspace file server
//!
//! Values come from built-in defaults, an optional `workspace-fs.toml`,
//! `WORKSPACE_FS_*` environment variables and finally `WORKSPACE_ROOT`,
//! which always decides the sandbox directory. The result is loaded once at
//! startup and injected into the service; nothing reads the environment
//! afterwards.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "workspace-fs";
const ENV_PREFIX: &str = "WORKSPACE_FS";
const WORKSPACE_ROOT_VAR: &str = "WORKSPACE_ROOT";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_WORKSPACE_ROOT: &str = "./workspace";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address the HTTP listener binds to
    pub bind_address: String,

    /// HTTP port
    pub port: u16,

    /// Sandbox base directory for every file operation
    pub workspace_root: String,

    /// Maximum size of a single uploaded file in MiB
    pub max_file_size_mb: u64,

    /// Upper bound for one file operation
    pub operation_timeout_secs: u64,

    /// Bearer token required on `/files/*` when set
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            workspace_root: DEFAULT_WORKSPACE_ROOT.to_string(),
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            api_token: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, config file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option(WORKSPACE_ROOT_VAR.to_lowercase(), std::env::var(WORKSPACE_ROOT_VAR).ok())?;

        Self::from_builder(builder)
    }

    /// Builder pre-populated with the built-in defaults
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("workspace_root", DEFAULT_WORKSPACE_ROOT)?
            .set_default("max_file_size_mb", DEFAULT_MAX_FILE_SIZE_MB as i64)?
            .set_default("operation_timeout_secs", DEFAULT_OPERATION_TIMEOUT_SECS as i64)
    }

    /// Build, deserialize and validate
    pub fn from_builder(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.workspace_root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "workspace_root cannot be empty".into(),
            ));
        }

        if self.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.operation_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "operation_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.api_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(config::ConfigError::Message(
                "api_token cannot be blank when set".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as socket address string
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get workspace root as PathBuf
    pub fn workspace_root_path(&self) -> PathBuf {
        PathBuf::from(&self.workspace_root)
    }

    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Get operation timeout as Duration
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}
