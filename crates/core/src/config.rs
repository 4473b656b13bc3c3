use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::slots::SchedulingConfig;
use crate::timewindow::{ensure_business_zone, DEFAULT_BUSINESS_TIMEZONE};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub calendar: ServiceConfig,
    pub conferencing: ServiceConfig,
    pub messaging: MessagingConfig,
    pub scheduling: SchedulingSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Connection settings for one external HTTP collaborator.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulingSettings {
    pub timezone: String,
    pub slot_minutes: i64,
    pub buffer_minutes: i64,
    pub search_days: i64,
    pub max_results: usize,
    pub offer_ttl_hours: i64,
}

impl SchedulingSettings {
    pub fn to_scheduling_config(&self) -> SchedulingConfig {
        SchedulingConfig {
            slot_minutes: self.slot_minutes,
            buffer_minutes: self.buffer_minutes,
            search_days: self.search_days,
            max_results: self.max_results,
            offer_ttl_hours: self.offer_ttl_hours,
        }
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
                url: "sqlite://slotly.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            calendar: ServiceConfig {
                base_url: "http://localhost:9401".to_string(),
                api_key: None,
                timeout_secs: 20,
            },
            conferencing: ServiceConfig {
                base_url: "http://localhost:9402".to_string(),
                api_key: None,
                timeout_secs: 20,
            },
            messaging: MessagingConfig {
                enabled: false,
                base_url: "http://localhost:9403".to_string(),
                api_key: None,
                timeout_secs: 20,
            },
            scheduling: SchedulingSettings {
                timezone: DEFAULT_BUSINESS_TIMEZONE.to_string(),
                slot_minutes: 60,
                buffer_minutes: 30,
                search_days: 14,
                max_results: 10,
                offer_ttl_hours: 24,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    calendar: Option<ServicePatch>,
    conferencing: Option<ServicePatch>,
    messaging: Option<MessagingPatch>,
    scheduling: Option<SchedulingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulingPatch {
    timezone: Option<String>,
    slot_minutes: Option<i64>,
    buffer_minutes: Option<i64>,
    search_days: Option<i64>,
    max_results: Option<usize>,
    offer_ttl_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Layered load: defaults, then an optional TOML file, then `SLOTLY_*`
    /// environment overrides, then validation.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("slotly.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
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
        if let Some(calendar) = patch.calendar {
            apply_service_patch(&mut self.calendar, calendar);
        }
        if let Some(conferencing) = patch.conferencing {
            apply_service_patch(&mut self.conferencing, conferencing);
        }
        if let Some(messaging) = patch.messaging {
            if let Some(enabled) = messaging.enabled {
                self.messaging.enabled = enabled;
            }
            if let Some(base_url) = messaging.base_url {
                self.messaging.base_url = base_url;
            }
            if let Some(api_key) = messaging.api_key {
                self.messaging.api_key = Some(api_key.into());
            }
            if let Some(timeout_secs) = messaging.timeout_secs {
                self.messaging.timeout_secs = timeout_secs;
            }
        }
        if let Some(scheduling) = patch.scheduling {
            if let Some(timezone) = scheduling.timezone {
                self.scheduling.timezone = timezone;
            }
            if let Some(slot_minutes) = scheduling.slot_minutes {
                self.scheduling.slot_minutes = slot_minutes;
            }
            if let Some(buffer_minutes) = scheduling.buffer_minutes {
                self.scheduling.buffer_minutes = buffer_minutes;
            }
            if let Some(search_days) = scheduling.search_days {
                self.scheduling.search_days = search_days;
            }
            if let Some(max_results) = scheduling.max_results {
                self.scheduling.max_results = max_results;
            }
            if let Some(offer_ttl_hours) = scheduling.offer_ttl_hours {
                self.scheduling.offer_ttl_hours = offer_ttl_hours;
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
        if let Some(url) = read_env("SLOTLY_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(raw) = read_env("SLOTLY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("SLOTLY_DATABASE_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(base_url) = read_env("SLOTLY_CALENDAR_BASE_URL") {
            self.calendar.base_url = base_url;
        }
        if let Some(api_key) = read_env("SLOTLY_CALENDAR_API_KEY") {
            self.calendar.api_key = Some(api_key.into());
        }
        if let Some(base_url) = read_env("SLOTLY_CONFERENCING_BASE_URL") {
            self.conferencing.base_url = base_url;
        }
        if let Some(api_key) = read_env("SLOTLY_CONFERENCING_API_KEY") {
            self.conferencing.api_key = Some(api_key.into());
        }
        if let Some(raw) = read_env("SLOTLY_MESSAGING_ENABLED") {
            self.messaging.enabled = parse_env("SLOTLY_MESSAGING_ENABLED", &raw)?;
        }
        if let Some(base_url) = read_env("SLOTLY_MESSAGING_BASE_URL") {
            self.messaging.base_url = base_url;
        }
        if let Some(api_key) = read_env("SLOTLY_MESSAGING_API_KEY") {
            self.messaging.api_key = Some(api_key.into());
        }
        if let Some(timezone) = read_env("SLOTLY_TIMEZONE") {
            self.scheduling.timezone = timezone;
        }
        if let Some(level) = read_env("SLOTLY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = read_env("SLOTLY_LOG_FORMAT") {
            self.logging.format = raw
                .parse()
                .map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SLOTLY_LOG_FORMAT".to_string(),
                    value: raw,
                })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        ensure_business_zone(&self.scheduling.timezone)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        if self.scheduling.slot_minutes <= 0 {
            return Err(ConfigError::Validation(
                "scheduling.slot_minutes must be positive".to_string(),
            ));
        }
        if self.scheduling.buffer_minutes < 0 {
            return Err(ConfigError::Validation(
                "scheduling.buffer_minutes must not be negative".to_string(),
            ));
        }
        if self.scheduling.search_days <= 0 || self.scheduling.search_days > 90 {
            return Err(ConfigError::Validation(
                "scheduling.search_days must be within 1..=90".to_string(),
            ));
        }
        if self.scheduling.max_results == 0 {
            return Err(ConfigError::Validation(
                "scheduling.max_results must be at least 1".to_string(),
            ));
        }
        if self.messaging.enabled && self.messaging.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "messaging.base_url must be set when messaging is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn apply_service_patch(target: &mut ServiceConfig, patch: ServicePatch) {
    if let Some(base_url) = patch.base_url {
        target.base_url = base_url;
    }
    if let Some(api_key) = patch.api_key {
        target.api_key = Some(api_key.into());
    }
    if let Some(timeout_secs) = patch.timeout_secs {
        target.timeout_secs = timeout_secs;
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    if let Some(from_env) = read_env("SLOTLY_CONFIG") {
        let path = PathBuf::from(from_env);
        return path.exists().then_some(path);
    }
    let default = PathBuf::from("slotly.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let mut config = AppConfig::default();
        config.scheduling.timezone = "Not/AZone".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_slot_duration() {
        let mut config = AppConfig::default();
        config.scheduling.slot_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_patch_overrides_defaults() {
        let mut config = AppConfig::default();
        let patch = toml::from_str(
            r#"
            [database]
            url = "sqlite://bookings.db"

            [scheduling]
            timezone = "Asia/Tokyo"
            buffer_minutes = 45
            "#,
        )
        .expect("patch parses");
        config.apply_patch(patch);
        assert_eq!(config.database.url, "sqlite://bookings.db");
        assert_eq!(config.scheduling.timezone, "Asia/Tokyo");
        assert_eq!(config.scheduling.buffer_minutes, 45);
        // Untouched sections keep defaults.
        assert_eq!(config.scheduling.slot_minutes, 60);
    }
}
