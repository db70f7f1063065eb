// Validated application configuration
// Built once at startup and handed to each component; never mutated afterwards

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::types::{LoggingSettings, Settings};

/// Fatal configuration problems, reported before any listener is bound
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("basic auth username must be provided")]
    MissingUsername,

    #[error("basic auth password must be provided")]
    MissingPassword,

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
}

/// Credentials required for uploads
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Connection timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Request headers, and each stall between upload body chunks
    pub read: Duration,
    /// Producing a response head for non-upload requests
    pub write: Duration,
    /// Keep-alive connection with no request in flight
    pub idle: Duration,
}

/// Immutable application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Public URL prefix used in the usage snippet and download links
    pub base_url: String,
    pub credentials: Credentials,
    pub storage_dir: PathBuf,
    pub max_upload_size: u64,
    pub timeouts: Timeouts,
    pub workers: Option<usize>,
    pub logging: LoggingSettings,
}

impl TryFrom<Settings> for AppConfig {
    type Error = StartupError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        if settings.auth.username.is_empty() {
            return Err(StartupError::MissingUsername);
        }
        if settings.auth.password.is_empty() {
            return Err(StartupError::MissingPassword);
        }

        let ip: IpAddr = settings
            .server
            .host
            .parse()
            .map_err(|_| StartupError::InvalidAddress(settings.server.host.clone()))?;
        let listen_addr = SocketAddr::new(ip, settings.server.port);

        let base_url = derive_base_url(
            settings.server.base_url.as_deref(),
            settings.server.public_host.as_deref(),
            settings.server.port,
        );

        Ok(Self {
            listen_addr,
            base_url,
            credentials: Credentials {
                username: settings.auth.username,
                password: settings.auth.password,
            },
            storage_dir: PathBuf::from(settings.storage.dir),
            max_upload_size: settings.storage.max_upload_size,
            timeouts: Timeouts {
                read: Duration::from_secs(settings.performance.read_timeout),
                write: Duration::from_secs(settings.performance.write_timeout),
                idle: Duration::from_secs(settings.performance.idle_timeout),
            },
            workers: settings.server.workers,
            logging: settings.logging,
        })
    }
}

/// Pick the public base URL: explicit override, then public host, then localhost
fn derive_base_url(base_url: Option<&str>, public_host: Option<&str>, port: u16) -> String {
    if let Some(url) = base_url.map(str::trim).filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }
    match public_host.map(str::trim).filter(|h| !h.is_empty()) {
        Some(host) => format!("https://{host}"),
        None => format!("http://localhost:{port}"),
    }
}
