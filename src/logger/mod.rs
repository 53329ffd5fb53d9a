//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error, warning and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        config.logging.level.eq_ignore_ascii_case("debug"),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    if writer::is_initialized() {
        writer::get().write_info(message);
    } else {
        println!("{message}");
    }
}

/// Write to error log
fn write_error(message: &str) {
    if writer::is_initialized() {
        writer::get().write_error(message);
    } else {
        eprintln!("{message}");
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    if writer::is_initialized() {
        writer::get().write_access(message);
    } else {
        println!("{message}");
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("JSON API server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Base path: {}", config.http.base_path));
    match &config.store.path {
        Some(path) => write_info(&format!("Database: {path}")),
        None => write_info("Database: in-memory"),
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if config.debug {
        write_info("Debug mode: error detail is exposed to clients");
    }
    if config.dispatch.upsert_on_missing {
        write_info("Updates on unknown ids create the document");
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Only written when `logging.level = "debug"`
pub fn log_debug(message: &str) {
    if writer::is_initialized() && writer::get().debug_enabled() {
        writer::get().write_info(&format!("[DEBUG] {message}"));
    }
}

/// Store faults keep their full detail here even when clients only see a
/// generic message
pub fn log_store_fault(method: &str, path: &str, detail: &str) {
    log_error(&format!("{method} {path}: {detail}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_shutdown(signal: &str) {
    write_info(&format!("\n[Shutdown] {signal} received, no longer accepting connections"));
}
