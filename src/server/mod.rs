// Server module entry point
// Listener setup, the accept loop, per-connection serving and shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so use server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::run;
pub use signal::{shutdown_channel, spawn_signal_listener};

use crate::config::{AppConfig, Timeouts};
use crate::handler::Router;

/// State shared by every connection
pub struct ServerState {
    pub router: Router,
    pub timeouts: Timeouts,
    /// Access log format, `None` when access logging is off
    pub access_log_format: Option<String>,
}

impl ServerState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            router: Router::new(config),
            timeouts: config.timeouts,
            access_log_format: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
        }
    }
}
