// Configuration types module
// Raw settings as deserialized from defaults, config file and environment

use serde::Deserialize;

/// Raw layered settings, validated into `AppConfig` before use
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub performance: PerformanceSettings,
    pub logging: LoggingSettings,
}

/// Listener and public address settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Public host name; the base URL becomes `https://<public_host>`
    #[serde(default)]
    pub public_host: Option<String>,
    /// Full base URL override, wins over `public_host`
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Basic auth credentials guarding uploads
#[derive(Deserialize, Clone, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// Keep secrets out of debug output
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Storage root and upload cap
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub dir: String,
    pub max_upload_size: u64,
}

/// Connection timeouts, in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceSettings {
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub idle_timeout: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}
