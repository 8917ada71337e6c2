//! Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load `.env` from the working directory (if any) before reading.
    pub fn with_dotenv(self) -> Self {
        dotenvy::dotenv().ok();
        self
    }

    /// Load all (prefixed) environment variables, keys lowercased and
    /// stripped of the prefix.
    pub fn load(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for (key, value) in env::vars() {
            if let Some(ref prefix) = self.prefix {
                if let Some(trimmed) = key.strip_prefix(prefix.as_str()) {
                    config.insert(trimmed.trim_start_matches('_').to_lowercase(), value);
                }
            } else {
                config.insert(key.to_lowercase(), value);
            }
        }

        config
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Load and parse a variable. Missing variables yield `Ok(None)`;
    /// present but unparsable ones are an error.
    pub fn load_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let full_key = self.full_key(key);
        match env::var(&full_key) {
            Ok(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    key: full_key,
                    reason: e.to_string(),
                }),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::EnvError(e)),
        }
    }

    /// Load a boolean flag (`1`, `true`, `yes` / `0`, `false`, `no`).
    pub fn load_flag(&self, key: &str) -> Result<Option<bool>> {
        let Some(raw) = self.load_parsed::<String>(key)? else {
            return Ok(None);
        };
        match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(ConfigError::InvalidValue {
                key: self.full_key(key),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
