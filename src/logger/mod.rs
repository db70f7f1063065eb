//! Logger module
//!
//! Provides logging utilities for the server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support
//!
//! Credentials and `Authorization` headers are never passed to this module.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{AppConfig, LoggingSettings};
use chrono::Local;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(logging: &LoggingSettings) -> std::io::Result<()> {
    writer::init(
        logging.access_log_file.as_deref(),
        logging.error_log_file.as_deref(),
    )
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_info(message: &str) {
    write_info(&format!("{} [INFO] {message}", timestamp()));
}

pub fn log_warning(message: &str) {
    write_error(&format!("{} [WARN] {message}", timestamp()));
}

pub fn log_error(message: &str) {
    write_error(&format!("{} [ERROR] {message}", timestamp()));
}

pub fn log_server_start(config: &AppConfig) {
    write_info("======================================");
    write_info("sharebox started successfully");
    write_info(&format!("Listening on: http://{}", config.listen_addr));
    write_info(&format!("Public URL: {}", config.base_url));
    write_info(&format!("Storage directory: {}", config.storage_dir.display()));
    write_info(&format!("Max upload size: {} bytes", config.max_upload_size));
    if let Some(workers) = config.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log_error(&format!("Failed to serve connection: {err}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_shutdown_requested(signal: &str) {
    log_info(&format!("{signal} received, no longer accepting connections"));
}
