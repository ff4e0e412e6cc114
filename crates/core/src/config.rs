use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::pagination::PageDefaults;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Pagination defaults per list family. Values are configuration only;
/// handlers receive them as immutable [`PageDefaults`] value objects.
#[derive(Clone, Debug)]
pub struct PaginationConfig {
    pub offer_page_size: u32,
    pub offer_max_page_size: u32,
    pub review_page_size: u32,
    pub review_max_page_size: u32,
}

impl PaginationConfig {
    pub fn offers(&self) -> PageDefaults {
        PageDefaults { page_size: self.offer_page_size, max_page_size: self.offer_max_page_size }
    }

    pub fn reviews(&self) -> PageDefaults {
        PageDefaults { page_size: self.review_page_size, max_page_size: self.review_max_page_size }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tradepost.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            pagination: PaginationConfig {
                offer_page_size: 6,
                offer_max_page_size: 100,
                review_page_size: 10,
                review_max_page_size: 50,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    pagination: Option<PaginationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaginationPatch {
    offer_page_size: Option<u32>,
    offer_max_page_size: Option<u32>,
    review_page_size: Option<u32>,
    review_max_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Load configuration in layers: defaults, then the optional
    /// `tradepost.toml`, then `TRADEPOST_*` environment variables, then
    /// programmatic overrides, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tradepost.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(pagination) = patch.pagination {
            if let Some(offer_page_size) = pagination.offer_page_size {
                self.pagination.offer_page_size = offer_page_size;
            }
            if let Some(offer_max_page_size) = pagination.offer_max_page_size {
                self.pagination.offer_max_page_size = offer_max_page_size;
            }
            if let Some(review_page_size) = pagination.review_page_size {
                self.pagination.review_page_size = review_page_size;
            }
            if let Some(review_max_page_size) = pagination.review_max_page_size {
                self.pagination.review_max_page_size = review_max_page_size;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TRADEPOST_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TRADEPOST_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TRADEPOST_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TRADEPOST_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TRADEPOST_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRADEPOST_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("TRADEPOST_SERVER_PORT") {
            self.server.port = parse_u16("TRADEPOST_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("TRADEPOST_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("TRADEPOST_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("TRADEPOST_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("TRADEPOST_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("TRADEPOST_LOGGING_LEVEL").or_else(|| read_env("TRADEPOST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRADEPOST_LOGGING_FORMAT").or_else(|| read_env("TRADEPOST_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_string(),
            ));
        }

        let pagination = &self.pagination;
        for (name, page_size, max_page_size) in [
            ("offer", pagination.offer_page_size, pagination.offer_max_page_size),
            ("review", pagination.review_page_size, pagination.review_max_page_size),
        ] {
            if page_size == 0 {
                return Err(ConfigError::Validation(format!(
                    "pagination.{name}_page_size must be at least 1"
                )));
            }
            if max_page_size < page_size {
                return Err(ConfigError::Validation(format!(
                    "pagination.{name}_max_page_size must not be below the default page size"
                )));
            }
        }

        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let default = PathBuf::from("tradepost.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_pass_validation() {
        let config = AppConfig::load(LoadOptions::default()).expect("defaults are valid");

        assert_eq!(config.pagination.offers().page_size, 6);
        assert_eq!(config.pagination.offers().max_page_size, 100);
        assert_eq!(config.pagination.reviews().page_size, 10);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn config_file_values_patch_the_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite::memory:\"\n\n[pagination]\noffer_page_size = 12\n\n[logging]\nformat = \"json\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect("file patch applies");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.pagination.offer_page_size, 12);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8000, "unpatched sections keep defaults");
    }

    #[test]
    fn a_required_missing_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn programmatic_overrides_win_last() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                port: Some(9000),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("overrides apply");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn pagination_invariants_are_validated() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[pagination]\noffer_max_page_size = 2\n").expect("write config");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn log_format_parses_from_strings() {
        assert_eq!("json".parse::<LogFormat>().expect("parse"), LogFormat::Json);
        assert!(" PRETTY ".parse::<LogFormat>().is_ok());
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
