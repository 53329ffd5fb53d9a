//! Request-level errors and their HTTP mapping

use hyper::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body that claims to be JSON but does not parse
    #[error("invalid JSON payload: {0}")]
    MalformedInput(String),

    /// Method/id combination outside the routing table
    #[error("unsupported request: {0}")]
    UnsupportedOperation(String),

    #[error("failed to read request body: {0}")]
    UnreadableBody(String),

    #[error("not found")]
    NotFound,

    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(u64),

    /// Any store failure other than absence
    #[error("internal fault: {0}")]
    InternalFault(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MalformedInput(_) | Self::UnreadableBody(_) | Self::UnsupportedOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response payload; sensitive detail only appears when `debug` is set
    pub fn to_body(&self, debug: bool) -> Value {
        match self {
            Self::MalformedInput(detail) => json!({
                "error": "Invalid JSON payload",
                "detail": detail,
            }),
            Self::UnreadableBody(detail) => json!({
                "error": "Failed to read request body",
                "detail": detail,
            }),
            Self::PayloadTooLarge(limit) => json!({
                "error": "Payload too large",
                "detail": format!("limit is {limit} bytes"),
            }),
            Self::NotFound => json!({ "error": "Not Found" }),
            Self::UnsupportedOperation(detail) => with_detail("Unsupported request", detail, debug),
            Self::InternalFault(detail) => with_detail("Unexpected server error", detail, debug),
        }
    }
}

fn with_detail(message: &str, detail: &str, debug: bool) -> Value {
    if debug {
        json!({ "error": message, "detail": detail })
    } else {
        json!({ "error": message })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound,
            other => Self::InternalFault(other.to_string()),
        }
    }
}
