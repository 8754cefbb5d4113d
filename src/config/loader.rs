use super::types::Config;
use crate::core::network::types::{Backend, NetworkKind};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file override (takes precedence over the default location)
pub const ENV_CONFIG_PATH: &str = "TASKDASH_CONFIG";

const ENV_DOWNLOAD_PUBLIC_URL: &str = "TASKDASH_DOWNLOAD_PUBLIC_URL";
const ENV_DOWNLOAD_PRIVATE_URL: &str = "TASKDASH_DOWNLOAD_PRIVATE_URL";
const ENV_TRANSCRIPTION_PUBLIC_URL: &str = "TASKDASH_TRANSCRIPTION_PUBLIC_URL";
const ENV_TRANSCRIPTION_PRIVATE_URL: &str = "TASKDASH_TRANSCRIPTION_PRIVATE_URL";
const ENV_HEALTH_CHECK_TIMEOUT_MS: &str = "TASKDASH_HEALTH_CHECK_TIMEOUT_MS";
const ENV_PROXY_TIMEOUT_MS: &str = "TASKDASH_PROXY_TIMEOUT_MS";
const ENV_CACHE_INTERVAL_MS: &str = "TASKDASH_CACHE_INTERVAL_MS";
const ENV_BIND: &str = "TASKDASH_BIND";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("Config read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Default config location: `~/.taskdash/config.toml`, or `TASKDASH_CONFIG` when set
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = env::var(ENV_CONFIG_PATH) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
        Ok(home.join(".taskdash").join("config.toml"))
    }

    /// Load from the default location. A missing file yields defaults; env overrides
    /// are applied in both cases.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Write the default config file unless one already exists
    pub fn init() -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        Self::init_at(&path)?;
        Ok(path)
    }

    pub fn init_at(path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Config::default().to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn print(&self) -> Result<(), ConfigError> {
        println!("{}", self.to_toml()?);
        Ok(())
    }

    /// Validate base URLs and timing values
    pub fn check(&self) -> Result<(), ConfigError> {
        for backend in Backend::ALL {
            let endpoint = self.backends.endpoint(backend);
            for network in [NetworkKind::Public, NetworkKind::Private] {
                let base_url = endpoint.base_url(network);
                let parsed = url::Url::parse(base_url).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "{} {} url '{}': {}",
                        backend, network, base_url, e
                    ))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid(format!(
                        "{} {} url '{}' must use http or https",
                        backend, network, base_url
                    )));
                }
            }
        }

        let timings = [
            ("timeouts.health_check_ms", self.timeouts.health_check_ms),
            ("timeouts.proxy_attempt_ms", self.timeouts.proxy_attempt_ms),
            ("timeouts.api_request_ms", self.timeouts.api_request_ms),
            ("network.cache_interval_ms", self.network.cache_interval_ms),
            ("polling.interval_ms", self.polling.interval_ms),
        ];
        for (name, value) in timings {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
            }
        }

        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .map_err(|e| {
                ConfigError::Invalid(format!("server.bind '{}': {}", self.server.bind, e))
            })?;

        Ok(())
    }

    /// Apply `TASKDASH_*` environment overrides; empty values are ignored
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let urls = [
            (ENV_DOWNLOAD_PUBLIC_URL, Backend::Download, NetworkKind::Public),
            (ENV_DOWNLOAD_PRIVATE_URL, Backend::Download, NetworkKind::Private),
            (ENV_TRANSCRIPTION_PUBLIC_URL, Backend::Transcription, NetworkKind::Public),
            (ENV_TRANSCRIPTION_PRIVATE_URL, Backend::Transcription, NetworkKind::Private),
        ];
        for (var, backend, network) in urls {
            if let Some(value) = read_env(var) {
                let endpoint = self.backends.endpoint_mut(backend);
                match network {
                    NetworkKind::Public => endpoint.public_url = value,
                    NetworkKind::Private => endpoint.private_url = value,
                }
            }
        }

        if let Some(value) = read_env_millis(ENV_HEALTH_CHECK_TIMEOUT_MS)? {
            self.timeouts.health_check_ms = value;
        }
        if let Some(value) = read_env_millis(ENV_PROXY_TIMEOUT_MS)? {
            self.timeouts.proxy_attempt_ms = value;
        }
        if let Some(value) = read_env_millis(ENV_CACHE_INTERVAL_MS)? {
            self.network.cache_interval_ms = value;
        }
        if let Some(value) = read_env(ENV_BIND) {
            self.server.bind = value;
        }
        Ok(())
    }
}

fn read_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_millis(var: &str) -> Result<Option<u64>, ConfigError> {
    match read_env(var) {
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    var, value
                ))
            }),
        None => Ok(None),
    }
}
