//! Validation alert handler
//!
//! Runs the business rule set against the current state of an instance and
//! sends one bot alert listing every violation. The same set of violations
//! on the same instance is alerted once per TTL window; a changed set alerts
//! again.

use crate::collaborators::{ApprovalPlatform, RuleValidator, bounded};
use crate::model::{ApprovalInstance, Violation};
use async_trait::async_trait;
use relay_cache::{IdempotencyCache, IdempotencyKey};
use relay_config::Settings;
use relay_events::{DUPLICATE, Event, EventHandler, HandlerError, MISSING_IDENTIFIER, Outcome};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

const PLATFORM: &str = "approval platform";

/// Handler name.
pub const VALIDATION_HANDLER: &str = "validation_alert";

/// Stable fingerprint of a violation set: first 16 hex chars of the
/// SHA-256 over the sorted, de-duplicated violations.
pub fn violation_set_hash(violations: &[Violation]) -> String {
    let mut sorted: Vec<&Violation> = violations.iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for v in sorted {
        hasher.update(v.kind.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(v.message.as_bytes());
        hasher.update(b"\x1e");
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(16);
    digest
}

/// Bot message body for an alert.
pub fn render_alert(instance: &ApprovalInstance, violations: &[Violation]) -> String {
    let mut text = format!(
        "Validation alert for approval {} ({} issue{})\n",
        instance.display_id(),
        violations.len(),
        if violations.len() == 1 { "" } else { "s" }
    );
    for (i, v) in violations.iter().enumerate() {
        // writing to a String cannot fail
        let _ = writeln!(text, "{}. [{}] {}", i + 1, v.kind, v.message);
    }
    let _ = write!(text, "Instance: {}", instance.code);
    text
}

/// Sends bot alerts for rule violations.
pub struct ValidationAlertHandler {
    platform: Arc<dyn ApprovalPlatform>,
    validator: Arc<dyn RuleValidator>,
    cache: IdempotencyCache,
    settings: Arc<Settings>,
}

impl ValidationAlertHandler {
    pub fn new(
        platform: Arc<dyn ApprovalPlatform>,
        validator: Arc<dyn RuleValidator>,
        cache: IdempotencyCache,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            platform,
            validator,
            cache,
            settings,
        }
    }

    /// `alert:{instance_code}:{violation_set_hash}`
    pub fn idempotency_key(instance_code: &str, violations: &[Violation]) -> IdempotencyKey {
        let hash = violation_set_hash(violations);
        IdempotencyKey::new("alert", [instance_code, hash.as_str()])
    }
}

#[async_trait]
impl EventHandler for ValidationAlertHandler {
    fn name(&self) -> &str {
        VALIDATION_HANDLER
    }

    fn domain(&self) -> &str {
        "validation"
    }

    async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError> {
        let Some(instance_code) = event.get_str("instance_code") else {
            return Ok(Outcome::skipped(MISSING_IDENTIFIER));
        };
        if !self.settings.enable_validation_alerts {
            return Ok(Outcome::skipped("alerts disabled"));
        }
        if let Some(status) = event.get_str("status")
            && self.settings.is_final_status(status)
        {
            return Ok(Outcome::skipped(format!("final status {}", status.to_uppercase())));
        }

        let timeout = self.settings.external_call_timeout();
        let instance = bounded(
            PLATFORM,
            "get_instance",
            timeout,
            self.platform.get_instance(instance_code),
        )
        .await?;

        if self.settings.is_final_status(&instance.status) {
            return Ok(Outcome::skipped(format!(
                "final status {}",
                instance.status.to_uppercase()
            )));
        }
        let violations = self.validator.validate(&instance);
        if violations.is_empty() {
            return Ok(Outcome::skipped("no errors"));
        }

        let key = Self::idempotency_key(instance_code, &violations);
        if self.cache.is_done(&key).await? {
            return Ok(Outcome::skipped(DUPLICATE));
        }

        warn!(
            instance_code,
            violations = violations.len(),
            "Approval instance breaks validation rules"
        );
        let text = render_alert(&instance, &violations);
        bounded(
            PLATFORM,
            "send_bot_message",
            timeout,
            self.platform.send_bot_message(&text),
        )
        .await?;
        self.cache.mark_done(&key).await?;

        info!(instance_code, key = %key, "Validation alert sent");
        Ok(Outcome::success(format!(
            "alert sent for {} with {} violation(s)",
            instance_code,
            violations.len()
        )))
    }
}
