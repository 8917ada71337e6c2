// approval-relay
//
// Event dispatch and idempotency engine for approval-workflow webhooks.
// A webhook receiver turns each platform notification into an event and
// publishes it on the event bus. Subscribed handlers run concurrently with
// isolated failures. Each side effect (a payment QR comment, a validation
// alert) happens at most once per TTL window.
//
// Usage:
//
// use approval_relay::{Collaborators, RelayApp};
//
// let app = RelayApp::from_env(Collaborators::new(platform, qr, extractor, validator))?;
// let report = app.handle_webhook(payload).await;
//
// Member crates are re-exported under their short names.

pub mod bootstrap;

pub use bootstrap::{AppError, Collaborators, RelayApp, register_domain_handlers};

pub use relay_cache as cache;
pub use relay_config as config;
pub use relay_events as events;
pub use relay_handlers as handlers;
pub use relay_log as log;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bootstrap::{AppError, Collaborators, RelayApp, register_domain_handlers};
    pub use relay_cache::{IdempotencyCache, IdempotencyKey, IdempotencyStore, InMemoryStore};
    pub use relay_config::{NodeConfig, NodeRule, Settings};
    pub use relay_events::{
        DispatchReport, Event, EventBus, EventHandler, HandlerError, HandlerRegistry, Outcome,
        Payload,
    };
    pub use relay_handlers::{
        APPROVAL_INSTANCE_UPDATED, AmountExtractor, ApprovalPlatform, QrGenerator,
        QrPaymentHandler, RuleValidator, ValidationAlertHandler,
    };
}
