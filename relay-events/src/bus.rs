//! Event Bus implementation

use crate::event::{Event, Payload};
use crate::handler::EventHandler;
use crate::history::{DEFAULT_HISTORY_CAPACITY, EventHistory, HistoryEntry};
use crate::outcome::{DispatchReport, HandlerOutcome, Outcome};
use crate::registry::{HandlerRegistry, RegistrationStatus, RegistryError};
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Event bus: records, resolves and dispatches published events.
///
/// Every resolved handler runs in its own tokio task; `publish` waits for
/// all of them and returns one outcome per handler. A handler that errors
/// or panics is reported as [`Outcome::Failed`] and never affects its
/// siblings. Clones share the registry and history.
#[derive(Clone)]
pub struct EventBus {
    /// Frozen after construction
    registry: Arc<HandlerRegistry>,

    history: Arc<EventHistory>,

    config: Arc<EventBusConfig>,
}

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Number of events kept in the history log
    pub history_capacity: usize,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            enable_logging: true,
        }
    }
}

impl EventBus {
    /// Create a bus dispatching to `registry`.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::with_config(registry, EventBusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(registry: HandlerRegistry, config: EventBusConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            history: Arc::new(EventHistory::new(config.history_capacity)),
            config: Arc::new(config),
        }
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Publish an event built from `event_type` and `payload`.
    ///
    /// Never fails: handler errors and panics are reported in the returned
    /// [`DispatchReport`]. With no subscribed handlers the report is empty.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let report = bus.publish("approval.instance.updated", payload).await;
    /// for outcome in report.iter() {
    ///     println!("{}: {}", outcome.handler, outcome.outcome);
    /// }
    /// ```
    pub async fn publish(&self, event_type: impl Into<String>, payload: Payload) -> DispatchReport {
        self.publish_event(Event::new(event_type, payload)).await
    }

    /// Publish an already built event.
    pub async fn publish_event(&self, event: Event) -> DispatchReport {
        let event = Arc::new(event);
        self.history.record(event.clone());

        let handlers = self.registry.resolve(event.event_type());
        if handlers.is_empty() {
            if self.config.enable_logging {
                warn!(
                    event_type = event.event_type(),
                    event_id = %event.id(),
                    "No handlers registered for event"
                );
            }
            self.history.complete(event.id(), Vec::new());
            return DispatchReport::new(event.id(), event.event_type(), Vec::new());
        }

        if self.config.enable_logging {
            info!(
                event_type = event.event_type(),
                event_id = %event.id(),
                handlers = handlers.len(),
                "Publishing event"
            );
        }

        let started = Instant::now();
        let names: Vec<String> = handlers.iter().map(|h| h.name().to_string()).collect();
        let tasks = handlers.into_iter().map(|handler| {
            let span = info_span!("handler", handler = handler.name(), event_id = %event.id());
            tokio::spawn(run_guarded(handler, event.clone()).instrument(span))
        });
        let results = join_all(tasks).await;

        let outcomes: Vec<HandlerOutcome> = names
            .into_iter()
            .zip(results)
            .map(|(handler, joined)| match joined {
                Ok(outcome) => outcome,
                Err(join_err) => HandlerOutcome {
                    handler,
                    outcome: Outcome::failed(format!("handler task aborted: {join_err}")),
                    duration: started.elapsed(),
                },
            })
            .collect();

        if self.config.enable_logging {
            for o in &outcomes {
                log_outcome(&event, o);
            }
            debug!(
                event_type = event.event_type(),
                event_id = %event.id(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Event dispatched"
            );
        }

        self.history.complete(event.id(), outcomes.clone());
        DispatchReport::new(event.id(), event.event_type(), outcomes)
    }

    /// The last `limit` published events, most recent last.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.recent(limit)
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registration_status(&self) -> RegistrationStatus {
        self.registry.status()
    }

    /// Get handler count for an event type
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.registry.handler_count(event_type)
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(HandlerRegistry::new())
    }
}

/// Run one handler, turning an error or a panic into `Failed`.
async fn run_guarded(handler: Arc<dyn EventHandler>, event: Arc<Event>) -> HandlerOutcome {
    let started = Instant::now();
    let result = AssertUnwindSafe(handler.handle(&event)).catch_unwind().await;

    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => Outcome::failed(err.to_string()),
        Err(panic) => Outcome::failed(format!("handler panicked: {}", panic_message(&*panic))),
    };

    HandlerOutcome {
        handler: handler.name().to_string(),
        outcome,
        duration: started.elapsed(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

fn log_outcome(event: &Event, o: &HandlerOutcome) {
    let elapsed_ms = o.duration.as_millis() as u64;
    match &o.outcome {
        Outcome::Success(detail) => info!(
            event_id = %event.id(),
            handler = %o.handler,
            elapsed_ms,
            detail = %detail,
            "Handler succeeded"
        ),
        Outcome::Skipped(reason) => debug!(
            event_id = %event.id(),
            handler = %o.handler,
            elapsed_ms,
            reason = %reason,
            "Handler skipped event"
        ),
        Outcome::Failed(err) => error!(
            event_id = %event.id(),
            handler = %o.handler,
            elapsed_ms,
            error = %err,
            "Handler failed"
        ),
    }
}

/// Event bus builder
pub struct EventBusBuilder {
    registry: HandlerRegistry,
    config: EventBusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            config: EventBusConfig::default(),
        }
    }

    /// Subscribe a handler to an event type
    pub fn register(
        mut self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self, RegistryError> {
        self.registry.register(event_type, handler)?;
        Ok(self)
    }

    /// Replace the registry wholesale
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set history capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Build the event bus
    pub fn build(self) -> EventBus {
        EventBus::with_config(self.registry, self.config)
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Clone)]
    struct TestHandler {
        name: &'static str,
        counter: Arc<AtomicU32>,
    }

    impl TestHandler {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                counter: Arc::new(AtomicU32::new(0)),
            }
        }

        fn count(&self) -> u32 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventHandler for TestHandler {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::success(format!("handled {}", event.event_type())))
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _event: &Event) -> Result<Outcome, HandlerError> {
            Err(HandlerError::upstream("approval platform", "HTTP 503"))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl EventHandler for PanickingHandler {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _event: &Event) -> Result<Outcome, HandlerError> {
            panic!("boom")
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish() {
        let handler = TestHandler::new("counter");
        let bus = EventBus::builder()
            .register("test.event", Arc::new(handler.clone()))
            .unwrap()
            .build();

        let report = bus.publish("test.event", Payload::new()).await;

        assert_eq!(handler.count(), 1);
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.get("counter"),
            Some(&Outcome::success("handled test.event"))
        );
    }

    #[tokio::test]
    async fn test_multiple_handlers() {
        let handler1 = TestHandler::new("one");
        let handler2 = TestHandler::new("two");
        let bus = EventBus::builder()
            .register("test.event", Arc::new(handler1.clone()))
            .unwrap()
            .register("test.event", Arc::new(handler2.clone()))
            .unwrap()
            .build();

        let report = bus.publish("test.event", Payload::new()).await;

        assert_eq!(handler1.count(), 1);
        assert_eq!(handler2.count(), 1);
        let names: Vec<_> = report.iter().map(|o| o.handler.as_str()).collect();
        assert_eq!(names, ["one", "two"]);
    }

    #[tokio::test]
    async fn test_no_handlers_is_empty_report() {
        let bus = EventBus::default();
        let report = bus.publish("unknown.event", Payload::new()).await;

        assert!(report.is_empty());
        assert_eq!(bus.history(10).len(), 1);
    }

    #[tokio::test]
    async fn test_error_and_panic_become_failed() {
        let ok = TestHandler::new("ok");
        let bus = EventBus::builder()
            .register("test.event", Arc::new(FailingHandler))
            .unwrap()
            .register("test.event", Arc::new(PanickingHandler))
            .unwrap()
            .register("test.event", Arc::new(ok.clone()))
            .unwrap()
            .build();

        let report = bus.publish("test.event", Payload::new()).await;

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.get("failing"),
            Some(&Outcome::failed("approval platform request failed: HTTP 503"))
        );
        assert_eq!(
            report.get("panicking"),
            Some(&Outcome::failed("handler panicked: boom"))
        );
        assert!(report.get("ok").is_some_and(Outcome::is_success));
        assert_eq!(ok.count(), 1);
    }

    #[tokio::test]
    async fn test_history_records_outcomes() {
        let bus = EventBus::builder()
            .register("test.event", Arc::new(TestHandler::new("counter")))
            .unwrap()
            .history_capacity(2)
            .build();

        for _ in 0..3 {
            bus.publish("test.event", Payload::new()).await;
        }

        let history = bus.history(10);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(HistoryEntry::is_complete));
    }

    #[tokio::test]
    async fn test_handler_count() {
        let bus = EventBus::builder()
            .register("test.event", Arc::new(TestHandler::new("a")))
            .unwrap()
            .build();

        assert_eq!(bus.handler_count("test.event"), 1);
        assert_eq!(bus.handler_count("other.event"), 0);
        assert_eq!(bus.registration_status().total_handlers, 1);
    }
}
