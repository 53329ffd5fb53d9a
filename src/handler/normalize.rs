//! Request normalization
//!
//! Turns method, path, query string and body into a [`Command`]: the
//! store-agnostic description of what the caller wants done.

use hyper::Method;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::parse_nested;
use crate::store::{deep_merge, ParamMap};

/// Dispatch method; HEAD has already collapsed into `Get`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Other(String),
}

impl CommandMethod {
    pub fn from_http(method: &Method) -> Self {
        match *method {
            Method::GET | Method::HEAD => Self::Get,
            Method::POST => Self::Post,
            Method::PUT => Self::Put,
            Method::PATCH => Self::Patch,
            Method::DELETE => Self::Delete,
            ref other => Self::Other(other.as_str().to_string()),
        }
    }
}

/// Normalized request, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    method: CommandMethod,
    resource: String,
    id: Option<String>,
    params: ParamMap,
}

impl Command {
    pub const fn method(&self) -> &CommandMethod {
        &self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub const fn params(&self) -> &ParamMap {
        &self.params
    }
}

/// Path split into its addressing parts
#[derive(Debug, PartialEq, Eq)]
pub enum Target<'a> {
    /// Empty path: the service descriptor
    Root,
    Resource { resource: &'a str, id: Option<&'a str> },
}

/// Raw request parts fed to the normalizer
pub struct RawRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug)]
pub enum Normalized {
    Root,
    Command(Command),
}

/// `/Project/12/` -> resource "Project", id "12"
pub fn parse_path(path: &str) -> Result<Target<'_>, ApiError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Target::Root);
    }

    let mut segments = trimmed.split('/');
    let resource = segments.next().unwrap_or_default();
    let id = segments.next();

    if segments.next().is_some() || id.is_some_and(str::is_empty) {
        return Err(ApiError::UnsupportedOperation(format!(
            "path '{path}' must be /{{Resource}} or /{{Resource}}/{{id}}"
        )));
    }

    Ok(Target::Resource { resource, id })
}

pub fn normalize(raw: &RawRequest<'_>) -> Result<Normalized, ApiError> {
    let (resource, id) = match parse_path(raw.path)? {
        Target::Root => return Ok(Normalized::Root),
        Target::Resource { resource, id } => (resource, id),
    };

    let method = CommandMethod::from_http(raw.method);

    // Decoded for every method so a broken JSON body is always rejected
    let body = decode_body(raw.content_type, raw.body)?;

    let mut params = raw
        .query
        .map(|q| parse_nested(q.as_bytes()))
        .unwrap_or_default();

    if method != CommandMethod::Get {
        if let Some(body) = body {
            deep_merge(&mut params, &body);
        }
    }

    Ok(Normalized::Command(Command {
        method,
        resource: resource.to_string(),
        id: id.map(str::to_string),
        params,
    }))
}

/// Body parameters: JSON objects and form data. Other JSON shapes and
/// other content types contribute nothing.
fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Option<ParamMap>, ApiError> {
    let Some(content_type) = content_type.map(str::to_ascii_lowercase) else {
        return Ok(None);
    };

    if content_type.contains("application/json") {
        if body.is_empty() {
            return Ok(None);
        }
        return match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Ok(None),
            Err(e) => Err(ApiError::MalformedInput(e.to_string())),
        };
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        return Ok(Some(parse_nested(body)));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JSON: Option<&str> = Some("application/json; charset=utf-8");
    const FORM: Option<&str> = Some("application/x-www-form-urlencoded");

    fn command(
        method: &Method,
        path: &str,
        query: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> Command {
        let raw = RawRequest {
            method,
            path,
            query,
            content_type,
            body: body.as_bytes(),
        };
        match normalize(&raw).unwrap() {
            Normalized::Command(cmd) => cmd,
            Normalized::Root => panic!("unexpected root for {path}"),
        }
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("/").unwrap(), Target::Root);
        assert_eq!(parse_path("").unwrap(), Target::Root);
        assert_eq!(parse_path("///").unwrap(), Target::Root);
        assert_eq!(
            parse_path("/Project").unwrap(),
            Target::Resource { resource: "Project", id: None }
        );
        assert_eq!(
            parse_path("/Project/").unwrap(),
            Target::Resource { resource: "Project", id: None }
        );
        assert_eq!(
            parse_path("/Project/abc-1/").unwrap(),
            Target::Resource { resource: "Project", id: Some("abc-1") }
        );
    }

    #[test]
    fn test_parse_path_rejects_extra_segments() {
        assert!(matches!(
            parse_path("/Project/1/issues"),
            Err(ApiError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            parse_path("/Project//1"),
            Err(ApiError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_resource_name_is_case_sensitive() {
        let cmd = command(&Method::GET, "/project", None, None, "");
        assert_eq!(cmd.resource(), "project");
    }

    #[test]
    fn test_head_collapses_to_get() {
        let cmd = command(&Method::HEAD, "/Project/1", None, None, "");
        assert_eq!(cmd.method(), &CommandMethod::Get);
        assert_eq!(cmd.id(), Some("1"));
        assert_eq!(
            CommandMethod::from_http(&Method::TRACE),
            CommandMethod::Other("TRACE".to_string())
        );
    }

    #[test]
    fn test_root_is_not_a_command() {
        let raw = RawRequest {
            method: &Method::GET,
            path: "/",
            query: Some("a=1"),
            content_type: JSON,
            body: b"{\"a\":",
        };
        assert!(matches!(normalize(&raw), Ok(Normalized::Root)));
    }

    #[test]
    fn test_get_ignores_body() {
        let cmd = command(
            &Method::GET,
            "/Issue",
            Some("projectId=p-1"),
            JSON,
            r#"{"projectId": "p-2", "extra": true}"#,
        );
        assert_eq!(Value::Object(cmd.params().clone()), json!({"projectId": "p-1"}));
    }

    #[test]
    fn test_body_wins_over_query_for_writes() {
        let cmd = command(
            &Method::PUT,
            "/Issue/1",
            Some("title=query&status=open&meta[owner]=ann"),
            JSON,
            r#"{"title": "body", "meta": {"level": 2}}"#,
        );
        assert_eq!(
            Value::Object(cmd.params().clone()),
            json!({
                "title": "body",
                "status": "open",
                "meta": {"owner": "ann", "level": 2}
            })
        );
    }

    #[test]
    fn test_form_body() {
        let cmd = command(
            &Method::POST,
            "/Project",
            None,
            FORM,
            "name=Alpha&tags[]=a&tags[]=b",
        );
        assert_eq!(
            Value::Object(cmd.params().clone()),
            json!({"name": "Alpha", "tags": ["a", "b"]})
        );
    }

    #[test]
    fn test_invalid_json_fails_fast() {
        for method in [Method::GET, Method::POST, Method::DELETE] {
            let raw = RawRequest {
                method: &method,
                path: "/Anything/1",
                query: None,
                content_type: JSON,
                body: b"{\"a\":",
            };
            assert!(matches!(normalize(&raw), Err(ApiError::MalformedInput(_))));
        }
    }

    #[test]
    fn test_non_object_json_is_ignored() {
        let cmd = command(&Method::POST, "/Project", Some("name=q"), JSON, "[1, 2]");
        assert_eq!(Value::Object(cmd.params().clone()), json!({"name": "q"}));

        let cmd = command(&Method::POST, "/Project", None, JSON, "42");
        assert!(cmd.params().is_empty());
    }

    #[test]
    fn test_empty_json_body_and_other_content_types() {
        let cmd = command(&Method::POST, "/Project", Some("a=1"), JSON, "");
        assert_eq!(Value::Object(cmd.params().clone()), json!({"a": "1"}));

        let cmd = command(&Method::POST, "/Project", None, Some("text/plain"), "{oops");
        assert!(cmd.params().is_empty());

        let cmd = command(&Method::POST, "/Project", None, None, "{oops");
        assert!(cmd.params().is_empty());
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        let cmd = command(
            &Method::POST,
            "/Project",
            None,
            Some("Application/JSON"),
            r#"{"name": "x"}"#,
        );
        assert_eq!(cmd.params()["name"], "x");
    }
}
