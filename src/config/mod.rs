// Configuration module entry point
// Loads layered settings and validates them into the immutable AppConfig

mod app;
mod types;

pub use app::{AppConfig, Credentials, StartupError, Timeouts};
pub use types::{LoggingSettings, Settings};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "sharebox";
pub const DEFAULT_PORT: u16 = 4000;
/// 1 GiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Environment variables as a key/value map
pub type EnvMap = config::Map<String, String>;

impl Settings {
    /// Load settings from defaults, an optional config file and the environment
    ///
    /// `config_path` is given without extension. `SHAREBOX_*` variables use
    /// `__` for nesting (`SHAREBOX_STORAGE__DIR`). The deployment variables
    /// `PORT`, `RAILWAY_STATIC_URL`, `AUTH_USERNAME` and `AUTH_PASSWORD` win
    /// over everything else; empty values count as unset.
    ///
    /// Environment values stay strings until deserialisation, so numeric
    /// keys still parse while secrets like `007` keep their exact text.
    pub fn load_from(config_path: &str, env: &EnvMap) -> Result<Self, config::ConfigError> {
        let deploy_var = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SHAREBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.clone())),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("auth.username", "")?
            .set_default("auth.password", "")?
            .set_default("storage.dir", "uploads")?
            .set_default("storage.max_upload_size", DEFAULT_MAX_UPLOAD_SIZE)?
            .set_default("performance.read_timeout", 10)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.idle_timeout", 60)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_override_option("server.port", deploy_var("PORT"))?
            .set_override_option("server.public_host", deploy_var("RAILWAY_STATIC_URL"))?
            .set_override_option("auth.username", deploy_var("AUTH_USERNAME"))?
            .set_override_option("auth.password", deploy_var("AUTH_PASSWORD"))?
            .build()?;

        settings.try_deserialize()
    }
}

impl AppConfig {
    /// Load and validate in one step
    pub fn load(config_path: &str, env: &EnvMap) -> Result<Self, StartupError> {
        let settings = Settings::load_from(config_path, env)?;
        Self::try_from(settings)
    }
}

/// Configuration for handler and server tests: fixed credentials
/// `alice`/`s3cret`, loopback listener on an ephemeral port, quiet access log
#[cfg(test)]
pub fn test_config(storage_dir: &std::path::Path) -> AppConfig {
    test_config_with(storage_dir, &[])
}

/// `test_config` with extra `SHAREBOX_*` style overrides
#[cfg(test)]
pub fn test_config_with(storage_dir: &std::path::Path, extra: &[(&str, &str)]) -> AppConfig {
    let env: EnvMap = [
        ("AUTH_USERNAME", "alice"),
        ("AUTH_PASSWORD", "s3cret"),
        ("SHAREBOX_SERVER__HOST", "127.0.0.1"),
        ("SHAREBOX_SERVER__PORT", "0"),
        ("SHAREBOX_LOGGING__ACCESS_LOG", "false"),
    ]
    .iter()
    .chain(extra)
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .chain([(
        "SHAREBOX_STORAGE__DIR".to_string(),
        storage_dir.to_string_lossy().into_owned(),
    )])
    .collect();
    AppConfig::load("this-config-file-does-not-exist", &env).expect("test config loads")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const NO_FILE: &str = "this-config-file-does-not-exist";

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_with_credentials() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[("AUTH_USERNAME", "alice"), ("AUTH_PASSWORD", "s3cret")]),
        )
        .unwrap();
        assert_eq!(cfg.listen_addr.port(), 4000);
        assert_eq!(cfg.base_url, "http://localhost:4000");
        assert_eq!(cfg.credentials.username, "alice");
        assert_eq!(cfg.credentials.password, "s3cret");
        assert_eq!(cfg.storage_dir, std::path::PathBuf::from("uploads"));
        assert_eq!(cfg.max_upload_size, 1_073_741_824);
        assert_eq!(cfg.timeouts.read, Duration::from_secs(10));
        assert_eq!(cfg.timeouts.write, Duration::from_secs(30));
        assert_eq!(cfg.timeouts.idle, Duration::from_secs(60));
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_deployment_variables() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[
                ("PORT", "8081"),
                ("RAILWAY_STATIC_URL", "share.up.railway.app"),
                ("AUTH_USERNAME", "u"),
                ("AUTH_PASSWORD", "p"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.listen_addr.port(), 8081);
        assert_eq!(cfg.base_url, "https://share.up.railway.app");
    }

    #[test]
    fn test_empty_public_host_falls_back_to_localhost() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[
                ("PORT", "5000"),
                ("RAILWAY_STATIC_URL", ""),
                ("AUTH_USERNAME", "u"),
                ("AUTH_PASSWORD", "p"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_prefixed_overrides() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[
                ("AUTH_USERNAME", "u"),
                ("AUTH_PASSWORD", "p"),
                ("SHAREBOX_STORAGE__DIR", "/var/lib/sharebox"),
                ("SHAREBOX_STORAGE__MAX_UPLOAD_SIZE", "2048"),
                ("SHAREBOX_PERFORMANCE__IDLE_TIMEOUT", "5"),
                ("SHAREBOX_LOGGING__ACCESS_LOG", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.storage_dir, std::path::PathBuf::from("/var/lib/sharebox"));
        assert_eq!(cfg.max_upload_size, 2048);
        assert_eq!(cfg.timeouts.idle, Duration::from_secs(5));
        assert!(!cfg.logging.access_log);
    }

    #[test]
    fn test_numeric_looking_strings_kept_verbatim() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[
                ("SHAREBOX_AUTH__USERNAME", "0042"),
                ("SHAREBOX_AUTH__PASSWORD", "007"),
                ("SHAREBOX_STORAGE__DIR", "1e3"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.credentials.username, "0042");
        assert_eq!(cfg.credentials.password, "007");
        assert_eq!(cfg.storage_dir, std::path::PathBuf::from("1e3"));
    }

    #[test]
    fn test_deployment_credentials_win_over_prefixed() {
        let cfg = AppConfig::load(
            NO_FILE,
            &env(&[
                ("SHAREBOX_AUTH__USERNAME", "from-prefix"),
                ("SHAREBOX_AUTH__PASSWORD", "from-prefix"),
                ("AUTH_USERNAME", "from-deploy"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.credentials.username, "from-deploy");
        assert_eq!(cfg.credentials.password, "from-prefix");
    }

    #[test]
    fn test_missing_username_is_fatal() {
        let err = AppConfig::load(NO_FILE, &env(&[("AUTH_PASSWORD", "p")])).unwrap_err();
        assert!(matches!(err, StartupError::MissingUsername));
        assert_eq!(err.to_string(), "basic auth username must be provided");
    }

    #[test]
    fn test_missing_password_is_fatal() {
        let err = AppConfig::load(
            NO_FILE,
            &env(&[("AUTH_USERNAME", "u"), ("AUTH_PASSWORD", "")]),
        )
        .unwrap_err();
        assert!(matches!(err, StartupError::MissingPassword));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let err = AppConfig::load(
            NO_FILE,
            &env(&[
                ("AUTH_USERNAME", "u"),
                ("AUTH_PASSWORD", "p"),
                ("SHAREBOX_SERVER__HOST", "not-an-ip"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, StartupError::InvalidAddress(_)));
    }

    #[test]
    fn test_config_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[server]\nport = 7000\nbase_url = \"https://files.example.org/\"\n\n[storage]\ndir = \"data\"\n",
        )
        .unwrap();
        let stem = dir.path().join("custom");
        let cfg = AppConfig::load(
            stem.to_str().unwrap(),
            &env(&[("AUTH_USERNAME", "u"), ("AUTH_PASSWORD", "p")]),
        )
        .unwrap();
        assert_eq!(cfg.listen_addr.port(), 7000);
        assert_eq!(cfg.base_url, "https://files.example.org");
        assert_eq!(cfg.storage_dir, std::path::PathBuf::from("data"));
    }
}
