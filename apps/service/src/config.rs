use std::time::Duration;
use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notifier::telegram::DEFAULT_API_BASE;
use crate::validation::{ValidationError, validate_interval, validate_positive};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse {path}: {source}")]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config directory: set XDG_CONFIG_HOME or HOME")]
    ConfigPathUnavailable,
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidOverride { name: &'static str, value: String },
}

pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_DATABASE_PATH: &str = "SITEWATCH_DATABASE_PATH";
pub const ENV_SWEEP_INTERVAL: &str = "SITEWATCH_SWEEP_INTERVAL_SECONDS";
pub const ENV_WORKERS: &str = "SITEWATCH_WORKERS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: Scheduler,
    pub refresh: Refresh,
    pub probe: Probe,
    pub notifications: Notifications,
    pub database: Database,
    pub server: Server,
}

/// Periodic sweep settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub interval_seconds: u64,
    pub workers: usize,
    /// Deadline for a single target within a sweep
    pub target_timeout_seconds: u64,
}

/// On-demand owner refresh settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Refresh {
    pub max_concurrency: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub client_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notifications {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,
    pub api_base: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub path: path::PathBuf,
    pub max_connections: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { interval_seconds: 300, workers: 20, target_timeout_seconds: 15 }
    }
}

impl Default for Refresh {
    fn default() -> Self {
        Self { max_concurrency: 10, timeout_seconds: 12 }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self { client_timeout_seconds: 10 }
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self { telegram_token: None, api_base: DEFAULT_API_BASE.into(), timeout_seconds: 5 }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self { path: "sitewatch.db".into(), max_connections: 16 }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/sitewatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("sitewatch/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "Interval (s)", &self.scheduler.interval_seconds)?;
        write_1(f, "Workers", &self.scheduler.workers)?;
        write_1(f, "Target Timeout (s)", &self.scheduler.target_timeout_seconds)?;
        write_title_1(f, "Refresh")?;
        write_1(f, "Max Concurrency", &self.refresh.max_concurrency)?;
        write_1(f, "Timeout (s)", &self.refresh.timeout_seconds)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Client Timeout (s)", &self.probe.client_timeout_seconds)?;
        write_title_1(f, "Notifications")?;
        let token_state = if self.notifications.telegram_token.is_some() { "set" } else { "unset" };
        write_1(f, "Telegram Token", &token_state)?;
        write_1(f, "API Base", &self.notifications.api_base)?;
        write_1(f, "Timeout (s)", &self.notifications.timeout_seconds)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path.display())?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;

        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride { name, value })
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/sitewatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// use sitewatch_service::config::Config;
    ///
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), sitewatch_service::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| ConfigError::ParseFailed { path: config_path, source })
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    /// File config, then `.env` and process environment on top, then validation
    pub fn load(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::from_config(optional_path)?;
        config.apply_env_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the supported environment overrides through `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(token) = lookup(ENV_TELEGRAM_TOKEN) {
            self.notifications.telegram_token = Some(token).filter(|token| !token.trim().is_empty());
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database.path = path.into();
        }
        if let Some(interval) = lookup(ENV_SWEEP_INTERVAL) {
            self.scheduler.interval_seconds = parse_override(ENV_SWEEP_INTERVAL, interval)?;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.scheduler.workers = parse_override(ENV_WORKERS, workers)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval("scheduler.interval_seconds", self.scheduler.interval_seconds)?;
        validate_positive("scheduler.workers", self.scheduler.workers as u64)?;
        validate_positive("scheduler.target_timeout_seconds", self.scheduler.target_timeout_seconds)?;
        validate_positive("refresh.max_concurrency", self.refresh.max_concurrency as u64)?;
        validate_positive("refresh.timeout_seconds", self.refresh.timeout_seconds)?;
        validate_positive("probe.client_timeout_seconds", self.probe.client_timeout_seconds)?;
        validate_positive("notifications.timeout_seconds", self.notifications.timeout_seconds)?;
        validate_positive("database.max_connections", self.database.max_connections as u64)?;
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_seconds)
    }

    pub fn target_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.target_timeout_seconds)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.timeout_seconds)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.client_timeout_seconds)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notifications.timeout_seconds)
    }
}
