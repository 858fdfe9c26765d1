//! Server configuration.
//!
//! Loaded from `PDV_*` environment variables with fallback to defaults.
//!
//! | Variable                   | Default                               |
//! |----------------------------|---------------------------------------|
//! | `PDV_BIND_ADDR`            | `127.0.0.1:3000`                      |
//! | `PDV_DB_PATH`              | platform data dir, `pdv.db`           |
//! | `PDV_REQUEST_TIMEOUT_SECS` | `30`                                  |
//! | `PDV_DB_MAX_CONNECTIONS`   | `5`                                   |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub request_timeout: Duration,
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("PDV_BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PDV_BIND_ADDR".to_string()))?;

        let database_path = match lookup("PDV_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_database_path()?,
        };

        let request_timeout_secs: u64 = lookup("PDV_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PDV_REQUEST_TIMEOUT_SECS".to_string()))?;

        let db_max_connections: u32 = lookup("PDV_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PDV_DB_MAX_CONNECTIONS".to_string()))?;
        if db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("PDV_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(ServerConfig {
            bind_addr,
            database_path,
            request_timeout: Duration::from_secs(request_timeout_secs),
            db_max_connections,
        })
    }
}

/// Platform data directory for the database.
///
/// - **Linux**: `~/.local/share/pdv/pdv.db`
/// - **macOS**: `~/Library/Application Support/br.pdv.pdv/pdv.db`
/// - **Windows**: `%APPDATA%\pdv\pdv\data\pdv.db`
fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("br", "pdv", "pdv").ok_or(ConfigError::NoDataDir)?;
    Ok(dirs.data_dir().join("pdv.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory; set PDV_DB_PATH")]
    NoDataDir,
}
