// Configuration module entry point
// Loads the startup configuration and builds the shared application state

mod state;
mod types;

use std::net::SocketAddr;
use thiserror::Error;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, CorsConfig, DispatchConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    ServerConfig, StoreConfig,
};

/// Invalid configuration detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {reason}")]
    Address { addr: String, reason: String },

    #[error("cors.allow_credentials cannot be combined with a wildcard origin")]
    CredentialsWithWildcard,
}

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence, lowest first: built-in defaults, `APP_DEBUG`, the config
    /// file, then `API_*` environment variables (`__` separates sections).
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let app_debug = std::env::var("APP_DEBUG").ok();

        let mut builder = config::Config::builder().set_default("debug", false)?;
        if let Some(value) = app_debug {
            builder = builder.set_default("debug", value)?;
        }

        let settings = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.backlog", 128)?
            .set_default("server.reuse_port", true)?
            .set_default("http.server_name", "json-api-server")?
            .set_default("http.service_name", "json-api-server")?
            .set_default("http.base_path", "/")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("cors.enabled", true)?
            .set_default("cors.allow_credentials", false)?
            .set_default("store.pretty", true)?
            .set_default("dispatch.upsert_on_missing", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;
        cfg.http.base_path = normalize_base_path(&cfg.http.base_path);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject combinations that would produce invalid responses
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::CredentialsWithWildcard);
        }
        self.get_socket_addr()?;
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Address {
            reason: e.to_string(),
            addr,
        })
    }
}

/// Leading slash, no trailing slash; the root mount is "/"
fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        debug: false,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            backlog: 128,
            reuse_port: true,
        },
        http: HttpConfig {
            server_name: "json-api-server".to_string(),
            service_name: "json-api-server".to_string(),
            base_path: "/".to_string(),
            max_body_size: 1024,
        },
        cors: CorsConfig {
            enabled: true,
            allow_credentials: false,
            allowed_origins: Vec::new(),
            max_age: None,
        },
        store: StoreConfig {
            path: None,
            pretty: true,
        },
        dispatch: DispatchConfig {
            upsert_on_missing: false,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
            access_log_file: None,
            error_log_file: None,
        },
        performance: PerformanceConfig {
            keep_alive_timeout: 75,
            read_timeout: 30,
            write_timeout: 30,
            max_connections: None,
        },
    }
}
