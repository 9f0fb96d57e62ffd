use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::entities::address::LABEL_ATTRIBUTES;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_LABEL_SEPARATOR: &str = ", ";
const DEFAULT_LOGGABLE_MORPH: &str = "addressable";

/// Attributes joined into an address label when nothing else is configured
const DEFAULT_LABEL_ATTRIBUTES: [&str; 7] = [
    "street_type",
    "street",
    "number",
    "building",
    "city",
    "administrative_area",
    "postal_area",
];

/// How an address is rendered as a single line
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LabelConfig {
    /// Address columns read, in order, when building the label
    #[serde(default = "default_label_attributes")]
    pub attributes: Vec<String>,

    /// Placed between the non-empty parts
    #[serde(default = "default_label_separator")]
    pub separator: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            attributes: default_label_attributes(),
            separator: default_label_separator(),
        }
    }
}

impl LabelConfig {
    pub fn new<I, S>(attributes: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            separator: separator.into(),
        }
    }

    /// Rejects attribute names that are not labelable address columns
    pub fn validate_attributes(&self) -> Result<(), ValidationError> {
        let unknown: Vec<&str> = self
            .attributes
            .iter()
            .map(String::as_str)
            .filter(|name| !LABEL_ATTRIBUTES.contains(name))
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        let mut err = ValidationError::new("label_attributes");
        err.message = Some(format!("Unknown address attributes: {}", unknown.join(", ")).into());
        Err(err)
    }
}

/// Settings consumed by the address services
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AddressesConfig {
    #[serde(default)]
    pub label: LabelConfig,

    /// Relation name under which address changes are recorded by the audit log
    #[serde(default = "default_loggable_morph")]
    pub loggable_morph: String,
}

impl Default for AddressesConfig {
    fn default() -> Self {
        Self {
            label: LabelConfig::default(),
            loggable_morph: default_loggable_morph(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Capacity of the audit event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Address labelling and audit settings
    #[serde(default)]
    pub addresses: AddressesConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the essentials
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            addresses: AddressesConfig::default(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = self.addresses.label.validate_attributes() {
            errors.add("addresses.label.attributes", err);
        }

        if self.addresses.loggable_morph.trim().is_empty() {
            let mut err = ValidationError::new("loggable_morph");
            err.message = Some("The loggable morph must not be empty".into());
            errors.add("addresses.loggable_morph", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs derive-based and cross-field validation
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.validate_additional_constraints()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_label_attributes() -> Vec<String> {
    DEFAULT_LABEL_ATTRIBUTES
        .iter()
        .map(|attribute| attribute.to_string())
        .collect()
}

fn default_label_separator() -> String {
    DEFAULT_LABEL_SEPARATOR.to_string()
}

fn default_loggable_morph() -> String {
    DEFAULT_LOGGABLE_MORPH.to_string()
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("Event channel capacity must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("addresses={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from the `config` directory
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://addresses.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&config_dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&config_dir.join(&run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate_all().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn base_config() -> AppConfig {
        AppConfig::new("sqlite::memory:".into(), "test".into())
    }

    fn write_config(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn defaults_pass_validation() {
        let cfg = base_config();
        assert!(cfg.validate_all().is_ok());
        assert_eq!(cfg.addresses.label.separator, ", ");
        assert_eq!(cfg.addresses.loggable_morph, "addressable");
        assert!(cfg
            .addresses
            .label
            .attributes
            .iter()
            .all(|a| LABEL_ATTRIBUTES.contains(&a.as_str())));
    }

    #[test]
    fn unknown_label_attribute_is_rejected() {
        let mut cfg = base_config();
        cfg.addresses.label = LabelConfig::new(["street", "zip_code"], " / ");
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors
            .errors()
            .contains_key("addresses.label.attributes"));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn empty_loggable_morph_is_rejected() {
        let mut cfg = base_config();
        cfg.addresses.loggable_morph = "  ".into();
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn zero_event_channel_capacity_is_rejected() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("event_channel_capacity"));
    }

    #[test]
    fn pool_bounds_are_checked() {
        let mut cfg = base_config();
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 4;
        assert!(cfg.validate_all().is_err());
    }

    #[test]
    fn loads_label_settings_from_default_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
                database_url = "sqlite::memory:"
                environment = "test"

                [addresses]
                loggable_morph = "owner"

                [addresses.label]
                attributes = ["street", "city", "postal_area"]
                separator = " | "
            "#,
        );

        let cfg = load_config_from(dir.path()).unwrap();

        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(
            cfg.addresses.label,
            LabelConfig::new(["street", "city", "postal_area"], " | ")
        );
        assert_eq!(cfg.addresses.loggable_morph, "owner");
    }

    #[test]
    fn missing_directory_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config_from(&dir.path().join("absent")).unwrap();
        assert_eq!(cfg.addresses, AddressesConfig::default());
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn invalid_file_settings_fail_validation() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
                database_url = "sqlite::memory:"
                environment = "test"

                [addresses.label]
                attributes = ["street", "planet"]
            "#,
        );

        let result = load_config_from(dir.path());
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
