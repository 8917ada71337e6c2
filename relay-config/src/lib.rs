//! Configuration for approval-relay: settings from the environment or files,
//! and the node rule table consumed by the QR handler.

pub mod env;
pub mod error;
pub mod loader;
pub mod node;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use node::{NodeCondition, NodeConfig, NodeKind, NodeRule, Strategy};
pub use settings::{ENV_PREFIX, Settings};
pub use validation::{ConfigValidator, Validate};

/// Load settings from the environment and, when `node_config_path` is set,
/// the node rules it points at.
pub fn load() -> Result<(Settings, NodeConfig)> {
    let settings = Settings::from_env()?;
    let nodes = match settings.node_config_path {
        Some(ref path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };
    Ok((settings, nodes))
}
