//! Process-wide settings.
//!
//! Every field has a default and can be overridden from `RELAY_*`
//! environment variables (optionally via a `.env` file) or from a JSON/TOML
//! file with the same field names.

use crate::{ConfigLoader, ConfigValidator, EnvLoader, Result, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "RELAY";

/// Runtime settings for the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long a completed side effect suppresses redeliveries.
    pub idempotency_ttl_secs: u64,

    /// Number of dispatches retained in the event history.
    pub history_capacity: usize,

    /// Upper bound for any single call a handler makes to a collaborator.
    pub external_call_timeout_secs: u64,

    /// Whether the validation handler may send alerts at all.
    pub enable_validation_alerts: bool,

    /// User id comments are posted as.
    pub default_user_id: String,

    /// Layout template passed to the QR generator.
    pub qr_template: String,

    /// Instance statuses after which no handler acts any more.
    pub final_statuses: Vec<String>,

    /// Optional path of the node rule file.
    pub node_config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            idempotency_ttl_secs: 15 * 60,
            history_capacity: 200,
            external_call_timeout_secs: 30,
            enable_validation_alerts: true,
            default_user_id: "approval-relay".to_string(),
            qr_template: "compact2".to_string(),
            final_statuses: vec![
                "REJECTED".to_string(),
                "CANCELED".to_string(),
                "DELETED".to_string(),
            ],
            node_config_path: None,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `RELAY_*` variables (and `.env`), validated.
    pub fn from_env() -> Result<Self> {
        Self::from_loader(&EnvLoader::new(Some(ENV_PREFIX.to_string())).with_dotenv())
    }

    /// Defaults overlaid with the variables visible to `env`, validated.
    pub fn from_loader(env: &EnvLoader) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(v) = env.load_parsed("IDEMPOTENCY_TTL_SECS")? {
            settings.idempotency_ttl_secs = v;
        }
        if let Some(v) = env.load_parsed("HISTORY_CAPACITY")? {
            settings.history_capacity = v;
        }
        if let Some(v) = env.load_parsed("EXTERNAL_CALL_TIMEOUT_SECS")? {
            settings.external_call_timeout_secs = v;
        }
        if let Some(v) = env.load_flag("ENABLE_VALIDATION_ALERTS")? {
            settings.enable_validation_alerts = v;
        }
        if let Some(v) = env.load_parsed::<String>("DEFAULT_USER_ID")? {
            settings.default_user_id = v;
        }
        if let Some(v) = env.load_parsed::<String>("QR_TEMPLATE")? {
            settings.qr_template = v;
        }
        if let Some(v) = env.load_parsed::<String>("FINAL_STATUSES")? {
            settings.final_statuses = v
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = env.load_parsed::<String>("NODE_CONFIG_PATH")? {
            settings.node_config_path = Some(PathBuf::from(v));
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load from a JSON or TOML file; missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let value = ConfigLoader::auto(path.as_ref())?.load_file(path.as_ref())?;
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| crate::ConfigError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }

    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }

    /// Whether `status` is terminal (case-insensitive).
    pub fn is_final_status(&self, status: &str) -> bool {
        self.final_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status))
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive_at_most(self.idempotency_ttl_secs, 86_400, "idempotency_ttl_secs")?;
        ConfigValidator::positive_at_most(self.history_capacity, 100_000, "history_capacity")?;
        ConfigValidator::positive_at_most(
            self.external_call_timeout_secs,
            600,
            "external_call_timeout_secs",
        )?;
        ConfigValidator::not_empty(&self.default_user_id, "default_user_id")?;
        ConfigValidator::not_empty(&self.qr_template, "qr_template")?;
        ConfigValidator::status_list(&self.final_statuses, "final_statuses")?;
        Ok(())
    }
}
