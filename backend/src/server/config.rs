//! Application configuration loaded via OrthoConfig.

use std::net::SocketAddr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "postgres://localhost/scheduling";

/// Runtime settings for the scheduling backend.
///
/// Values come from CLI flags, the environment (prefix `SCHEDULING_`), or a
/// configuration file, in OrthoConfig's usual precedence order.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SCHEDULING")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Maximum connections in the database pool.
    #[ortho_config(default = 10)]
    pub db_pool_size: u32,
    /// Debounce window for duplicate notifications, in milliseconds.
    /// Zero disables debouncing entirely.
    #[ortho_config(default = 120_000)]
    pub debounce_window_ms: u64,
}

impl AppSettings {
    /// Parsed bind address, falling back to the default.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    /// Database URL, falling back to the default.
    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }
}
