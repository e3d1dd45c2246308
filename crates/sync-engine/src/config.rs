use chrono_tz::Tz;
use connectors::directory::client::DirectoryConfig;
use connectors::metrics::client::{Environment, VendorConfig};
use model::metric::{MetricKind, ANCHOR_METRIC};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Where daily metrics come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    Api,
    Fixture,
}

impl SourceMode {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "api" => Some(Self::Api),
            "fixture" => Some(Self::Fixture),
            _ => None,
        }
    }
}

/// Engine-side settings, everything except vendor and directory
/// credentials.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_root: PathBuf,
    pub database: String,
    pub dead_letter_path: PathBuf,
    pub anchor: MetricKind,
    pub default_timezone: Tz,
    pub source: SourceMode,
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            database: "wearables".to_string(),
            dead_letter_path: PathBuf::from("data/dead_letters.jsonl"),
            anchor: ANCHOR_METRIC,
            default_timezone: Tz::UTC,
            source: SourceMode::Api,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_dead_letter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dead_letter_path = path.into();
        self
    }

    pub fn with_anchor(mut self, anchor: MetricKind) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_default_timezone(mut self, timezone: Tz) -> Self {
        self.default_timezone = timezone;
        self
    }

    pub fn with_source(mut self, source: SourceMode) -> Self {
        self.source = source;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reads engine settings from `SYNC_*` environment variables.
    /// `SYNC_DATA_ROOT` is required, everything else falls back to the
    /// defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default().with_data_root(required("SYNC_DATA_ROOT")?);
        if let Some(database) = optional("SYNC_DATABASE") {
            config = config.with_database(database);
        }
        if let Some(path) = optional("SYNC_DEAD_LETTER_PATH") {
            config = config.with_dead_letter_path(path);
        }
        if let Some(raw) = optional("SYNC_ANCHOR_METRIC") {
            let anchor = MetricKind::from_name(&raw).ok_or(ConfigError::InvalidValue {
                var: "SYNC_ANCHOR_METRIC",
                value: raw,
            })?;
            config = config.with_anchor(anchor);
        }
        if let Some(raw) = optional("SYNC_DEFAULT_TIMEZONE") {
            let timezone = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "SYNC_DEFAULT_TIMEZONE",
                value: raw,
            })?;
            config = config.with_default_timezone(timezone);
        }
        if let Some(raw) = optional("SYNC_SOURCE") {
            let source = SourceMode::from_name(&raw).ok_or(ConfigError::InvalidValue {
                var: "SYNC_SOURCE",
                value: raw,
            })?;
            config = config.with_source(source);
        }
        Ok(config)
    }
}

/// Vendor API credentials from `VENDOR_*` environment variables.
pub fn vendor_from_env() -> Result<VendorConfig, ConfigError> {
    let base_url = required("VENDOR_API_BASE_URL")?;
    let api_key = required("VENDOR_API_KEY")?;
    let mut config = VendorConfig::new(base_url, api_key);
    if let Some(name) = optional("VENDOR_ENVIRONMENT") {
        let environment = Environment::from_name(&name).ok_or(ConfigError::InvalidValue {
            var: "VENDOR_ENVIRONMENT",
            value: name,
        })?;
        config = config.with_environment(environment);
    }
    Ok(config)
}

/// Directory credentials from `DIRECTORY_*` environment variables.
/// Returns `None` when none of them are set, so fixture and dry runs can
/// skip the directory entirely.
pub fn directory_from_env() -> Result<Option<DirectoryConfig>, ConfigError> {
    let base_url = optional("DIRECTORY_BASE_URL");
    let project_id = optional("DIRECTORY_PROJECT_ID");
    let token = optional("DIRECTORY_TOKEN");
    if base_url.is_none() && project_id.is_none() && token.is_none() {
        return Ok(None);
    }
    Ok(Some(DirectoryConfig {
        base_url: base_url.ok_or(ConfigError::MissingVar("DIRECTORY_BASE_URL"))?,
        project_id: project_id.ok_or(ConfigError::MissingVar("DIRECTORY_PROJECT_ID"))?,
        token: token.ok_or(ConfigError::MissingVar("DIRECTORY_TOKEN"))?,
    }))
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::MissingVar(var))
}

fn optional(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
