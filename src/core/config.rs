use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for the cache read plus origin fetch of one request.
    pub request_timeout_secs: u64,
    /// How long in-flight requests may run after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
    Disabled,
}

impl std::str::FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            "disabled" | "none" => Ok(CacheBackend::Disabled),
            _ => Err(anyhow::anyhow!("Invalid cache backend: {}", s)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis connection URL, password and database included,
    /// e.g. `redis://:secret@localhost:6379/0`.
    pub url: String,
    pub ttl_secs: u64,
    pub op_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            backend: CacheBackend::Redis,
            url: "redis://localhost:6379/0".to_string(),
            ttl_secs: 30 * 60,
            op_timeout_ms: 500,
            connect_timeout_ms: 5000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "https://v6.exchangerate-api.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Config gets dumped at debug level, so the key must never be printed.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Files that fed the loaded config. Logging is not up yet while loading,
/// so these are reported afterwards with [`ConfigSources::log`].
#[derive(Debug, Default, PartialEq)]
pub struct ConfigSources {
    pub config_file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl ConfigSources {
    pub fn log(&self) {
        match &self.config_file {
            Some(path) => debug!("Loaded config from {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }
        if let Some(path) = &self.env_file {
            debug!("Loaded environment from {}", path.display());
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads the config from `path`, or from the default location when it
    /// exists, then applies `.env` and environment overrides.
    pub fn load(path: Option<&str>) -> Result<(Self, ConfigSources)> {
        let config_file = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Some(Self::default_config_path()?).filter(|p| p.exists()),
        };
        let mut config = match &config_file {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };

        let env_file = dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok((
            config,
            ConfigSources {
                config_file,
                env_file,
            },
        ))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xconv", "xconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Overrides fields from environment variables; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| -> Result<Option<u64>> {
            var(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{key} must be a whole number, got {v:?}"))
                })
                .transpose()
        };

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = number("PORT")? {
            self.server.port = u16::try_from(port).context("PORT out of range")?;
        }
        if let Some(backend) = var("CACHE_BACKEND") {
            self.cache.backend = backend.parse()?;
        }
        if let Some(url) = var("REDIS_URL") {
            self.cache.url = url;
        }
        if let Some(ttl) = number("REDIS_TTL_SECS")? {
            self.cache.ttl_secs = ttl;
        }
        if let Some(url) = var("CURRENCY_API_URL") {
            self.api.base_url = url;
        }
        if let Some(key) = var("CURRENCY_KEY_API") {
            self.api.api_key = key;
        }
        if let Some(timeout) = number("API_TIMEOUT_SECS")? {
            self.api.timeout_secs = timeout;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                other => anyhow::bail!("Invalid LOG_FORMAT: {other}"),
            };
        }
        Ok(())
    }
}
