//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variable` substitution

use chrono::Local;
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::Version;
use std::net::SocketAddr;
use std::time::Instant;

/// Access log entry containing all request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    pub http_version: &'static str,
    pub status: u16,
    /// Response body size in bytes (0 for HEAD)
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
    started: Instant,
}

impl AccessLogEntry {
    /// Start an entry from the request head; the clock starts now
    pub fn from_request(parts: &Parts, peer: SocketAddr) -> Self {
        let header = |name: HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            remote_addr: peer.ip().to_string(),
            time: Local::now(),
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(ToString::to_string),
            http_version: version_label(parts.version),
            status: 0,
            body_bytes: 0,
            referer: header(REFERER),
            user_agent: header(USER_AGENT),
            request_time_us: 0,
            started: Instant::now(),
        }
    }

    /// Record the response outcome and elapsed time
    pub fn finish(&mut self, status: u16, body_bytes: u64) {
        self.status = status;
        self.body_bytes = body_bytes;
        self.request_time_us = u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX);
    }

    /// Format the log entry according to the specified format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            custom => self.format_custom(custom),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn time_local(&self) -> String {
        self.time.format("%d/%b/%Y:%H:%M:%S %z").to_string()
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time_local(),
            self.method,
            self.request_uri(),
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time`,
    /// `$status`, `$body_bytes_sent`, `$http_referer`, `$http_user_agent`.
    fn format_custom(&self, pattern: &str) -> String {
        let request_uri = self.request_uri();
        let request_line = format!("{} {request_uri} HTTP/{}", self.method, self.http_version);
        #[allow(clippy::cast_precision_loss)]
        let request_time = format!("{:.3}", self.request_time_us as f64 / 1_000_000.0);

        // Longer names first so `$request` does not eat `$request_time`
        let substitutions: [(&str, String); 11] = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time_local()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", request_time),
            ("$request_method", self.method.clone()),
            ("$request_uri", request_uri),
            ("$request", request_line),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            ("$http_referer", self.referer.clone().unwrap_or_else(|| "-".to_string())),
            (
                "$http_user_agent",
                self.user_agent.clone().unwrap_or_else(|| "-".to_string()),
            ),
        ];

        substitutions
            .iter()
            .fold(pattern.to_string(), |acc, (name, value)| acc.replace(name, value))
    }
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
