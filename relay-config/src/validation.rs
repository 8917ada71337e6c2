//! Validation rules for settings and node rules

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Configuration that can check itself after loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Field-level checks shared by [`Settings`](crate::Settings) and
/// [`NodeRule`](crate::NodeRule).
pub struct ConfigValidator;

impl ConfigValidator {
    /// Reject blank strings.
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(field, "cannot be empty"));
        }
        Ok(())
    }

    /// A capacity or a number of seconds: above zero and at most `max`.
    pub fn positive_at_most<T>(value: T, max: T, field: &str) -> Result<()>
    where
        T: PartialOrd + Default + Display,
    {
        if value <= T::default() {
            return Err(invalid(field, format!("must be positive (got {value})")));
        }
        if value > max {
            return Err(invalid(field, format!("must be at most {max} (got {value})")));
        }
        Ok(())
    }

    /// A platform status token such as `PENDING` or `APPROVED`.
    pub fn status_name(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(
                field,
                format!("'{value}' is not a status name (letters, digits and '_')"),
            ));
        }
        Ok(())
    }

    /// A list of status names with no repeats; statuses compare case-insensitively.
    pub fn status_list(values: &[String], field: &str) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            Self::status_name(value, field)?;
            if values[..i].iter().any(|v| v.eq_ignore_ascii_case(value)) {
                return Err(invalid(field, format!("lists '{value}' twice")));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Display) -> ConfigError {
    ConfigError::ValidationError(format!("{field} {reason}"))
}
