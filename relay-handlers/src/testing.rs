//! In-memory collaborator doubles
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! tests in dependent crates. Each double counts its calls and records what
//! it was given.

use crate::collaborators::{
    AmountExtractor, ApprovalPlatform, CollaboratorError, CollaboratorResult, QrGenerator,
    RuleValidator,
};
use crate::model::{ApprovalInstance, Comment, FileRef, PaymentDetails, PaymentQrRequest, Violation};
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_config::NodeRule;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Approval platform double holding instances in memory.
#[derive(Default)]
pub struct FakePlatform {
    instances: Mutex<HashMap<String, ApprovalInstance>>,
    delay: Mutex<Option<Duration>>,
    fail_fetches: AtomicBool,
    fail_messages: AtomicBool,
    fetches: AtomicU32,
    uploads: Mutex<Vec<String>>,
    comments: Mutex<Vec<(String, Comment)>>,
    messages: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, instance: ApprovalInstance) -> Self {
        self.instances.lock().insert(instance.code.clone(), instance);
        self
    }

    pub fn put_instance(&self, instance: ApprovalInstance) {
        self.instances.lock().insert(instance.code.clone(), instance);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Uploaded filenames, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().clone()
    }

    pub fn comments(&self) -> Vec<(String, Comment)> {
        self.comments.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ApprovalPlatform for FakePlatform {
    async fn get_instance(&self, instance_code: &str) -> CollaboratorResult<ApprovalInstance> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Request("HTTP 503".into()));
        }
        self.instances
            .lock()
            .get(instance_code)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(instance_code.to_string()))
    }

    async fn upload_image(&self, _bytes: Vec<u8>, filename: &str) -> CollaboratorResult<FileRef> {
        self.pause().await;
        let mut uploads = self.uploads.lock();
        uploads.push(filename.to_string());
        Ok(FileRef {
            key: format!("file-{}", uploads.len()),
            filename: filename.to_string(),
        })
    }

    async fn post_comment(
        &self,
        instance_code: &str,
        comment: &Comment,
    ) -> CollaboratorResult<String> {
        self.pause().await;
        let mut comments = self.comments.lock();
        comments.push((instance_code.to_string(), comment.clone()));
        Ok(format!("comment-{}", comments.len()))
    }

    async fn send_bot_message(&self, text: &str) -> CollaboratorResult<()> {
        self.pause().await;
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Request("bot unavailable".into()));
        }
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

/// QR generator double returning a fixed image.
#[derive(Default)]
pub struct FakeQrGenerator {
    calls: AtomicU32,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<PaymentQrRequest>>,
}

impl FakeQrGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn requests(&self) -> Vec<PaymentQrRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl QrGenerator for FakeQrGenerator {
    async fn generate(&self, request: &PaymentQrRequest) -> CollaboratorResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Request("generator unavailable".into()));
        }
        self.requests.lock().push(request.clone());
        Ok(b"\x89PNG fake".to_vec())
    }
}

/// Extractor double returning the same details for every form.
pub struct FixedAmountExtractor {
    details: Option<PaymentDetails>,
}

impl FixedAmountExtractor {
    pub fn new(details: Option<PaymentDetails>) -> Self {
        Self { details }
    }
}

impl AmountExtractor for FixedAmountExtractor {
    fn extract(&self, _form: &Value, _rule: &NodeRule) -> CollaboratorResult<Option<PaymentDetails>> {
        Ok(self.details.clone())
    }
}

/// Validator double with a swappable violation list.
#[derive(Default)]
pub struct StaticValidator {
    violations: Mutex<Vec<Violation>>,
}

impl StaticValidator {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            violations: Mutex::new(violations),
        }
    }

    pub fn set(&self, violations: Vec<Violation>) {
        *self.violations.lock() = violations;
    }
}

impl RuleValidator for StaticValidator {
    fn validate(&self, _instance: &ApprovalInstance) -> Vec<Violation> {
        self.violations.lock().clone()
    }
}
