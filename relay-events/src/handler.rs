//! Handler trait and handler errors

use crate::event::Event;
use crate::outcome::Outcome;
use async_trait::async_trait;
use relay_cache::CacheError;
use std::time::Duration;

/// Errors a handler may return instead of an [`Outcome`].
///
/// The bus turns every one of these into [`Outcome::Failed`].
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{service} request failed: {reason}")]
    Upstream { service: String, reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("Idempotency cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Handler error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn upstream(service: impl Into<String>, reason: impl ToString) -> Self {
        HandlerError::Upstream {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        HandlerError::Timeout {
            operation: operation.into(),
            timeout,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::InvalidData(err.to_string())
    }
}

/// Unit of work subscribed to one or more event types.
///
/// Handlers are stateless apart from the shared idempotency cache and run
/// concurrently with their siblings, so implementations must be `Send + Sync`.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use relay_events::{Event, EventHandler, HandlerError, Outcome};
///
/// struct AuditHandler;
///
/// #[async_trait]
/// impl EventHandler for AuditHandler {
///     fn name(&self) -> &str {
///         "audit"
///     }
///
///     async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError> {
///         Ok(Outcome::success(format!("seen {}", event.event_type())))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let event = Event::new("audit.entry", Default::default());
/// let outcome = AuditHandler.handle(&event).await.unwrap();
/// assert_eq!(outcome, Outcome::success("seen audit.entry"));
/// # });
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Unique name within each event type this handler subscribes to.
    fn name(&self) -> &str;

    /// Owning domain, used in registration labels (`domain.name`).
    fn domain(&self) -> &str {
        "core"
    }

    async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError>;
}
