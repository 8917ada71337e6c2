//! Approval workflow handlers for approval-relay
//!
//! Two handlers react to `approval.instance.updated`:
//!
//! - [`QrPaymentHandler`] posts a payment QR code when an instance reaches a
//!   configured workflow node
//! - [`ValidationAlertHandler`] sends a bot alert when an instance breaks
//!   business rules
//!
//! Both follow the same steps: read the identifier from the event, fetch the
//! instance, check eligibility, check the idempotency cache, perform the
//! side effect and only then mark the key. Every collaborator call is bounded
//! by `Settings::external_call_timeout`.

pub mod collaborators;
pub mod model;
pub mod qr;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use collaborators::{
    AmountExtractor, ApprovalPlatform, CollaboratorError, CollaboratorResult, QrGenerator,
    RuleValidator,
};
pub use model::{
    APPROVAL_INSTANCE_UPDATED, ApprovalInstance, Comment, FileRef, PaymentDetails, PaymentKind,
    PaymentQrRequest, Task, Violation,
};
pub use qr::{QR_HANDLER, QrPaymentHandler};
pub use validation::{VALIDATION_HANDLER, ValidationAlertHandler, violation_set_hash};
