//! Capabilities the handlers consume
//!
//! Each trait stands for an external system or a piece of domain logic
//! owned elsewhere. Handlers only talk to these traits, so a platform
//! client, a QR service or a rule set can be swapped without touching them.

use crate::model::{ApprovalInstance, Comment, FileRef, PaymentDetails, PaymentQrRequest, Violation};
use async_trait::async_trait;
use relay_config::NodeRule;
use relay_events::HandlerError;
use serde_json::Value;
use std::time::Duration;

/// Collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Approval platform client.
#[async_trait]
pub trait ApprovalPlatform: Send + Sync {
    /// Fetch the current state of an instance.
    async fn get_instance(&self, instance_code: &str) -> CollaboratorResult<ApprovalInstance>;

    /// Upload an image and return a reference usable in comments.
    async fn upload_image(&self, bytes: Vec<u8>, filename: &str) -> CollaboratorResult<FileRef>;

    /// Post a comment on an instance; returns the comment id.
    async fn post_comment(&self, instance_code: &str, comment: &Comment)
    -> CollaboratorResult<String>;

    /// Send a message through the notification bot.
    async fn send_bot_message(&self, text: &str) -> CollaboratorResult<()>;
}

/// Payment QR code generator.
#[async_trait]
pub trait QrGenerator: Send + Sync {
    /// Render a QR image (PNG bytes) for the request.
    async fn generate(&self, request: &PaymentQrRequest) -> CollaboratorResult<Vec<u8>>;
}

/// Finds the payable amount in a form, following a node rule.
pub trait AmountExtractor: Send + Sync {
    /// `Ok(None)` when the form holds no usable amount for this node.
    fn extract(&self, form: &Value, rule: &NodeRule) -> CollaboratorResult<Option<PaymentDetails>>;
}

/// Business rule set run against an instance.
pub trait RuleValidator: Send + Sync {
    /// Every rule the instance breaks; empty when it is valid.
    fn validate(&self, instance: &ApprovalInstance) -> Vec<Violation>;
}

/// Await a collaborator call, bounded by `timeout`.
///
/// A timeout becomes [`HandlerError::Timeout`], any other failure
/// [`HandlerError::Upstream`] naming `service`.
pub async fn bounded<T, F>(
    service: &str,
    operation: &str,
    timeout: Duration,
    call: F,
) -> Result<T, HandlerError>
where
    F: Future<Output = CollaboratorResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(HandlerError::upstream(service, err)),
        Err(_) => Err(HandlerError::timeout(operation, timeout)),
    }
}
