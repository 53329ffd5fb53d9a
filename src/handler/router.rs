//! Request routing module
//!
//! Entry point for HTTP request processing: preflight short-circuit, base
//! path check, body collection, normalization, dispatch and emission.

use crate::config::AppState;
use crate::error::ApiError;
use crate::handler::dispatch::{Dispatcher, Reply};
use crate::handler::normalize::{normalize, parse_path, Normalized, RawRequest, Target};
use crate::http::{build_json_response, build_preflight_response, with_cors, CorsPolicy};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_TYPE, ORIGIN};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    peer: SocketAddr,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let mut entry = AccessLogEntry::from_request(&parts, peer);
    let config = &state.config;
    let cors = state.cors.headers(parts.headers.get(ORIGIN));

    let response = if CorsPolicy::is_preflight(&parts.method) {
        with_cors(build_preflight_response(&config.http.server_name), cors)
    } else {
        let is_head = parts.method == Method::HEAD;
        let (status, payload) = match route(&parts, body, &state).await {
            Ok(reply) => (reply.status, reply.payload),
            Err(err) => {
                if let ApiError::InternalFault(detail) = &err {
                    logger::log_store_fault(parts.method.as_str(), parts.uri.path(), detail);
                }
                (err.status(), err.to_body(config.debug))
            }
        };
        with_cors(
            build_json_response(status, &payload, is_head, &config.http.server_name),
            cors,
        )
    };

    if config.logging.access_log {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes);
        logger::log_access(&entry, &config.logging.access_log_format);
    }

    Ok(response)
}

/// Everything after the preflight check; errors become JSON error replies
async fn route<B>(
    parts: &hyper::http::request::Parts,
    body: B,
    state: &AppState,
) -> Result<Reply, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let base_path = &state.config.http.base_path;
    let Some(path) = strip_base_path(parts.uri.path(), base_path) else {
        return Err(ApiError::NotFound);
    };

    // The descriptor never looks at the body
    if parse_path(path)? == Target::Root {
        return Ok(root_reply(state));
    }

    let body = read_body(body, state.config.http.max_body_size).await?;
    let raw = RawRequest {
        method: &parts.method,
        path,
        query: parts.uri.query(),
        content_type: parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        body: &body,
    };

    match normalize(&raw)? {
        Normalized::Root => Ok(root_reply(state)),
        Normalized::Command(cmd) => {
            logger::log_debug(&format!("Dispatching {cmd:?}"));
            Dispatcher::new(&*state.store, state.missing_policy()).dispatch(&cmd)
        }
    }
}

fn root_reply(state: &AppState) -> Reply {
    Reply {
        status: StatusCode::OK,
        payload: service_descriptor(&state.config.http.service_name, &state.config.http.base_path),
    }
}

/// Path relative to the base path, or `None` when the request lies outside it
fn strip_base_path<'a>(path: &'a str, base_path: &str) -> Option<&'a str> {
    if base_path == "/" {
        return Some(path);
    }
    let rest = path.strip_prefix(base_path)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Collect the request body, enforcing `http.max_body_size`
async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!("Request body too large (max: {limit})"));
            Err(ApiError::PayloadTooLarge(limit))
        }
        Err(e) => Err(ApiError::UnreadableBody(e.to_string())),
    }
}

fn service_descriptor(service_name: &str, base_path: &str) -> Value {
    let prefix = base_path.trim_end_matches('/');
    let routes: Vec<String> = [
        "GET /{Resource}",
        "GET /{Resource}/{id}",
        "POST /{Resource}",
        "PUT /{Resource}/{id}",
        "PATCH /{Resource}/{id}",
        "DELETE /{Resource}/{id}",
    ]
    .iter()
    .map(|route| match route.split_once(' ') {
        Some((method, path)) => format!("{method} {prefix}{path}"),
        None => (*route).to_string(),
    })
    .collect();

    json!({
        "service": service_name,
        "status": "ready",
        "routes": routes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::store::testing::{CountingStore, FailingStore};
    use crate::store::ResourceStore;
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH};

    fn state_with(store: Arc<dyn ResourceStore>) -> Arc<AppState> {
        Arc::new(AppState::new(test_config(), store).unwrap())
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> (StatusCode, Response<Full<Bytes>>) {
        let resp = handle_request(req, peer(), Arc::clone(state)).await.unwrap();
        (resp.status(), resp)
    }

    async fn body_json(resp: Response<Full<Bytes>>) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_never_reaches_store() {
        let store = Arc::new(CountingStore::new());
        let state = state_with(store.clone());

        let (status, resp) = send(&state, request(Method::OPTIONS, "/Project/1", "")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_head_matches_get_without_body() {
        let state = state_with(Arc::new(CountingStore::new()));
        send(&state, request(Method::POST, "/Project", r#"{"name": "Alpha"}"#)).await;

        let (get_status, get) = send(&state, request(Method::GET, "/Project", "")).await;
        let (head_status, head) = send(&state, request(Method::HEAD, "/Project", "")).await;

        assert_eq!(get_status, StatusCode::OK);
        assert_eq!(head_status, get_status);
        assert_eq!(head.headers(), get.headers());
        assert_ne!(get.headers()[CONTENT_LENGTH], "0");
        let bytes = head.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_head_single_document_matches_get() {
        let state = state_with(Arc::new(CountingStore::new()));
        let (_, created) = send(&state, request(Method::POST, "/Project", r#"{"name": "Alpha"}"#)).await;
        let created = body_json(created).await;
        let path = format!("/Project/{}", created["id"].as_str().unwrap());

        let (get_status, get) = send(&state, request(Method::GET, &path, "")).await;
        let (head_status, head) = send(&state, request(Method::HEAD, &path, "")).await;

        assert_eq!(get_status, StatusCode::OK);
        assert_eq!(head_status, get_status);
        assert_eq!(head.headers(), get.headers());
        let head_bytes = head.into_body().collect().await.unwrap().to_bytes();
        assert!(head_bytes.is_empty());
        assert_eq!(body_json(get).await, created);
    }

    #[tokio::test]
    async fn test_root_ignores_oversized_body() {
        let store = Arc::new(CountingStore::new());
        let state = state_with(store.clone());
        let big = "x".repeat(4096);

        let (status, resp) = send(&state, request(Method::GET, "/", &big)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ready");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_deeply_nested_form_key_is_dropped() {
        let state = state_with(Arc::new(CountingStore::new()));
        let body = format!("a{}=1&name=Alpha", "[x]".repeat(300));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/Project")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from(body)))
            .unwrap();

        let (status, resp) = send(&state, req).await;
        assert_eq!(status, StatusCode::CREATED);
        let doc = body_json(resp).await;
        assert_eq!(doc["name"], "Alpha");
        assert!(doc.get("a").is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let store = Arc::new(CountingStore::new());
        let state = state_with(store.clone());

        let (status, resp) = send(&state, request(Method::POST, "/Project", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid JSON payload");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_empty_list() {
        let state = state_with(Arc::new(CountingStore::new()));
        send(&state, request(Method::POST, "/Project", r#"{"name": "Alpha"}"#)).await;

        let (status, resp) = send(&state, request(Method::GET, "/Project?nonexistent=x", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_create_returns_created_document() {
        let state = state_with(Arc::new(CountingStore::new()));
        let (status, resp) =
            send(&state, request(Method::POST, "/Issue", r#"{"title": "a", "projectId": "p-1"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        let doc = body_json(resp).await;
        assert_eq!(doc["title"], "a");
        assert!(doc["id"].is_string());
    }

    #[tokio::test]
    async fn test_unsupported_combinations() {
        let store = Arc::new(CountingStore::new());
        let state = state_with(store.clone());

        let (status, _) = send(&state, request(Method::POST, "/Project/123", r#"{"name": "x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, request(Method::PUT, "/Project", r#"{"name": "x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&state, request(Method::GET, "/Project/1/extra", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_root_descriptor() {
        let store = Arc::new(CountingStore::new());
        let state = state_with(store.clone());

        let (status, resp) = send(&state, request(Method::GET, "/", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let descriptor = body_json(resp).await;
        assert_eq!(descriptor["service"], "json-api-server");
        assert_eq!(descriptor["status"], "ready");
        assert!(descriptor["routes"]
            .as_array()
            .unwrap()
            .contains(&json!("GET /{Resource}/{id}")));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_base_path() {
        let mut config = test_config();
        config.http.base_path = "/api".to_string();
        let state = Arc::new(AppState::new(config, Arc::new(CountingStore::new())).unwrap());

        let (status, _) = send(&state, request(Method::GET, "/Project", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, request(Method::GET, "/apiProject", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, resp) = send(&state, request(Method::GET, "/api/Project", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));

        let (status, resp) = send(&state, request(Method::GET, "/api", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body_json(resp)
            .await["routes"]
            .as_array()
            .unwrap()
            .contains(&json!("POST /api/{Resource}")));
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let state = state_with(Arc::new(CountingStore::new()));
        let big = format!(r#"{{"name": "{}"}}"#, "x".repeat(2048));

        let (status, resp) = send(&state, request(Method::POST, "/Project", &big)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(resp).await["error"], "Payload too large");
    }

    #[tokio::test]
    async fn test_errors_carry_cors_headers() {
        let state = state_with(Arc::new(CountingStore::new()));

        let (status, resp) = send(&state, request(Method::GET, "/Project/missing", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_json(resp).await, json!({"error": "Not Found"}));
    }

    #[tokio::test]
    async fn test_store_fault_detail_only_in_debug() {
        let (status, resp) = send(
            &state_with(Arc::new(FailingStore)),
            request(Method::GET, "/Project", ""),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({"error": "Unexpected server error"}));

        let mut config = test_config();
        config.debug = true;
        let state = Arc::new(AppState::new(config, Arc::new(FailingStore)).unwrap());
        let (status, resp) = send(&state, request(Method::GET, "/Project", "")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(body["detail"].as_str().unwrap().contains("disk unavailable"));
    }

    #[test]
    fn test_strip_base_path() {
        assert_eq!(strip_base_path("/Project", "/"), Some("/Project"));
        assert_eq!(strip_base_path("/api/Project/1", "/api"), Some("/Project/1"));
        assert_eq!(strip_base_path("/api", "/api"), Some(""));
        assert_eq!(strip_base_path("/apiary", "/api"), None);
        assert_eq!(strip_base_path("/other", "/api"), None);
    }
}
