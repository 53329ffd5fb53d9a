// Application state module
// Holds the validated configuration, the derived CORS policy and the store

use std::sync::Arc;

use super::types::Config;
use super::ConfigError;
use crate::http::CorsPolicy;
use crate::store::{MissingPolicy, ResourceStore};

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub cors: CorsPolicy,
    pub store: Arc<dyn ResourceStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ResourceStore>) -> Result<Self, ConfigError> {
        let cors = CorsPolicy::from_config(&config.cors)?;
        Ok(Self {
            config,
            cors,
            store,
        })
    }

    /// Policy for PUT/PATCH on an unknown id
    pub const fn missing_policy(&self) -> MissingPolicy {
        if self.config.dispatch.upsert_on_missing {
            MissingPolicy::Upsert
        } else {
            MissingPolicy::Reject
        }
    }
}
