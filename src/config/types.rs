// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Expose error detail on unsupported-request and server-error responses
    #[serde(default)]
    pub debug: bool,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub cors: CorsConfig,
    pub store: StoreConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Listen backlog queue size
    pub backlog: i32,
    /// Enable `SO_REUSEPORT` on the listening socket
    pub reuse_port: bool,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` response header
    pub server_name: String,
    /// Service name reported by the root descriptor
    pub service_name: String,
    /// Path prefix under which resources are mounted (e.g. "/api")
    pub base_path: String,
    pub max_body_size: u64,
}

/// Cross-origin configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_credentials: bool,
    /// Origins allowed to receive an echoed `Access-Control-Allow-Origin`.
    /// Empty means every origin is echoed.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// `Access-Control-Max-Age` in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

/// Document store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path of the JSON database file (in-memory only if not set)
    #[serde(default)]
    pub path: Option<String>,
    pub pretty: bool,
}

/// Dispatcher behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Create the document when PUT/PATCH targets an unknown id
    pub upsert_on_missing: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}
