//! Payment QR handler
//!
//! When an approval reaches a configured workflow node, generate a payment
//! QR code for the amount on the form, upload it and post it as a comment on
//! the instance. Each `(instance, node)` pair is handled once per TTL window.

use crate::collaborators::{AmountExtractor, ApprovalPlatform, QrGenerator, bounded};
use crate::model::{ApprovalInstance, Comment, PaymentDetails, PaymentQrRequest};
use async_trait::async_trait;
use relay_cache::{IdempotencyCache, IdempotencyKey};
use relay_config::{NodeConfig, NodeRule, Settings};
use relay_events::{DUPLICATE, Event, EventHandler, HandlerError, MISSING_IDENTIFIER, Outcome};
use std::sync::Arc;
use tracing::{debug, info};

const PLATFORM: &str = "approval platform";
const QR_SERVICE: &str = "qr service";

/// Handler name, also the key namespace.
pub const QR_HANDLER: &str = "qr_generator";

/// Generates and posts payment QR codes.
pub struct QrPaymentHandler {
    platform: Arc<dyn ApprovalPlatform>,
    generator: Arc<dyn QrGenerator>,
    extractor: Arc<dyn AmountExtractor>,
    nodes: Arc<NodeConfig>,
    cache: IdempotencyCache,
    settings: Arc<Settings>,
}

/// Why an instance is not eligible at a node.
fn ineligible(instance: &ApprovalInstance, node: &str, rule: &NodeRule) -> Option<&'static str> {
    if !instance.has_task_in_status(node, &rule.required_status) {
        return Some("node not ready");
    }
    let conditions_met = rule
        .additional_conditions
        .iter()
        .all(|c| instance.has_task_in_status(&c.node_id, &c.required_status));
    if !conditions_met {
        return Some("conditions not met");
    }
    None
}

impl QrPaymentHandler {
    pub fn new(
        platform: Arc<dyn ApprovalPlatform>,
        generator: Arc<dyn QrGenerator>,
        extractor: Arc<dyn AmountExtractor>,
        nodes: Arc<NodeConfig>,
        cache: IdempotencyCache,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            platform,
            generator,
            extractor,
            nodes,
            cache,
            settings,
        }
    }

    /// `qr:{instance_code}:{node}`
    pub fn idempotency_key(instance_code: &str, node: &str) -> IdempotencyKey {
        IdempotencyKey::new("qr", [instance_code, node])
    }

    fn qr_request(&self, instance_code: &str, details: &PaymentDetails) -> PaymentQrRequest {
        PaymentQrRequest {
            instance_code: instance_code.to_string(),
            amount: details.amount,
            description: format!("{} {}", details.qr_type(), instance_code),
            template: self.settings.qr_template.clone(),
            account_number: details.account_number.clone(),
            account_name: details.account_name.clone(),
            bank_id: details.bank_id.clone(),
        }
    }

    /// Generate, upload and comment. Returns the comment id.
    async fn post_qr(
        &self,
        instance: &ApprovalInstance,
        details: &PaymentDetails,
    ) -> Result<String, HandlerError> {
        let timeout = self.settings.external_call_timeout();
        let request = self.qr_request(&instance.code, details);

        let image = bounded(QR_SERVICE, "generate", timeout, self.generator.generate(&request)).await?;
        if image.is_empty() {
            return Err(HandlerError::upstream(QR_SERVICE, "empty image"));
        }

        let filename = format!("{}_{}_qr.png", instance.code, details.qr_type());
        let file = bounded(
            PLATFORM,
            "upload_image",
            timeout,
            self.platform.upload_image(image, &filename),
        )
        .await?;
        debug!(instance_code = %instance.code, file = %file.key, "QR image uploaded");

        let comment = Comment {
            text: format!(
                "Payment QR ({}) for {}: amount {}\n{}",
                details.qr_type(),
                instance.display_id(),
                details.amount,
                request.description
            ),
            image: Some(file),
            user_id: self.settings.default_user_id.clone(),
        };
        bounded(
            PLATFORM,
            "post_comment",
            timeout,
            self.platform.post_comment(&instance.code, &comment),
        )
        .await
    }
}

#[async_trait]
impl EventHandler for QrPaymentHandler {
    fn name(&self) -> &str {
        QR_HANDLER
    }

    fn domain(&self) -> &str {
        "qr_generation"
    }

    async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError> {
        let (Some(instance_code), Some(node)) =
            (event.get_str("instance_code"), event.get_str("node"))
        else {
            return Ok(Outcome::skipped(MISSING_IDENTIFIER));
        };

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
        let Some(rule) = self.nodes.get(node) else {
            return Ok(Outcome::skipped("invalid node"));
        };
        if let Some(reason) = ineligible(&instance, node, rule) {
            return Ok(Outcome::skipped(reason));
        }
        let details = self
            .extractor
            .extract(&instance.form, rule)
            .map_err(|e| HandlerError::InvalidData(e.to_string()))?;
        let Some(details) = details else {
            return Ok(Outcome::skipped("no amount"));
        };
        if details.amount <= 0 {
            return Err(HandlerError::InvalidData(format!(
                "non-positive amount {} on {}",
                details.amount, instance_code
            )));
        }

        let key = Self::idempotency_key(instance_code, node);
        if self.cache.is_done(&key).await? {
            return Ok(Outcome::skipped(DUPLICATE));
        }

        let comment_id = self.post_qr(&instance, &details).await?;
        self.cache.mark_done(&key).await?;

        info!(
            instance_code,
            node,
            node_name = %rule.name,
            amount = details.amount,
            comment_id = %comment_id,
            "Payment QR posted"
        );
        Ok(Outcome::success(format!(
            "{} QR posted for {} (amount {})",
            details.qr_type(),
            instance_code,
            details.amount
        )))
    }
}
