//! HTTP protocol helpers
//!
//! - CORS policy
//! - Query string / form parsing
//! - JSON response building

pub mod cors;
pub mod query;
pub mod response;

pub use cors::CorsPolicy;
pub use query::parse_nested;
pub use response::{build_json_response, build_preflight_response, with_cors};
