//! Cross-origin policy
//!
//! Decides the `Access-Control-*` headers attached to every response and
//! whether a request is a preflight that ends before routing.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use hyper::Method;

use crate::config::{ConfigError, CorsConfig};

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    allow_credentials: bool,
    allowed_origins: Vec<String>,
    max_age: Option<u64>,
}

impl CorsPolicy {
    /// Build the policy, refusing credentials together with a wildcard origin
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        if config.allow_credentials && config.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::CredentialsWithWildcard);
        }
        Ok(Self {
            enabled: config.enabled,
            allow_credentials: config.allow_credentials,
            allowed_origins: config.allowed_origins.clone(),
            max_age: config.max_age,
        })
    }

    /// OPTIONS requests are answered with 204 before routing
    pub fn is_preflight(method: &Method) -> bool {
        method == Method::OPTIONS
    }

    /// CORS headers for a request carrying `origin`
    pub fn headers(&self, origin: Option<&HeaderValue>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.enabled {
            return headers;
        }

        match origin {
            Some(origin) => {
                if self.origin_allowed(origin) {
                    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                    if self.allow_credentials {
                        headers.insert(
                            ACCESS_CONTROL_ALLOW_CREDENTIALS,
                            HeaderValue::from_static("true"),
                        );
                    }
                }
                headers.insert(VARY, HeaderValue::from_static("Origin"));
            }
            // Credentials are never paired with the wildcard
            None if self.allowed_origins.is_empty() => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
            None => {}
        }

        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        if let Some(max_age) = self.max_age {
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }
        headers
    }

    fn origin_allowed(&self, origin: &HeaderValue) -> bool {
        self.allowed_origins.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.as_bytes() == origin.as_bytes())
    }
}
