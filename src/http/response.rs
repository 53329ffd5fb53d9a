//! HTTP response building module
//!
//! Serializes payloads to JSON, attaches CORS headers, and strips bodies
//! for HEAD requests while keeping status and headers intact.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};
use serde_json::Value;

/// Build a JSON response.
///
/// `Content-Length` always reports the serialized payload, so a HEAD
/// response carries the same headers as the equivalent GET.
pub fn build_json_response(
    status: StatusCode,
    payload: &Value,
    is_head: bool,
    server_name: &str,
) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(payload) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return build_fallback_error(server_name);
        }
    };

    let content_length = json.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(json)
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(CONTENT_LENGTH, content_length)
        .header(SERVER, server_name)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 204 response for CORS preflight requests
pub fn build_preflight_response(server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(SERVER, server_name)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("OPTIONS", &e);
            let mut resp = Response::new(Full::new(Bytes::new()));
            *resp.status_mut() = StatusCode::NO_CONTENT;
            resp
        })
}

/// Merge CORS headers into a finished response
pub fn with_cors(mut response: Response<Full<Bytes>>, cors: HeaderMap) -> Response<Full<Bytes>> {
    response.headers_mut().extend(cors);
    response
}

fn build_fallback_error(server_name: &str) -> Response<Full<Bytes>> {
    const BODY: &str = r#"{"error":"Unexpected server error"}"#;
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "application/json")
        .header(SERVER, server_name)
        .body(Full::new(Bytes::from_static(BODY.as_bytes())))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(BODY.as_bytes()))))
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
