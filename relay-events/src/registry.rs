//! Event type to handler registration table

use crate::handler::EventHandler;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler '{handler}' is already registered for '{event_type}'")]
    DuplicateHandler { event_type: String, handler: String },

    #[error("Event type must not be empty")]
    EmptyEventType,
}

/// Ordered handlers per event type.
///
/// Filled once at startup and append-only; the bus takes ownership and
/// never mutates it afterwards. Handler names are unique within an event
/// type so dispatch reports can be keyed by name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    event_types: Vec<String>,
}

/// Snapshot of what is registered, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub total_event_types: usize,
    pub total_handlers: usize,
    /// Event type to `domain.handler` labels, in registration order.
    pub registrations: BTreeMap<String, Vec<String>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `event_type`, after any handlers already there.
    pub fn register(
        &mut self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), RegistryError> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(RegistryError::EmptyEventType);
        }

        if !self.handlers.contains_key(&event_type) {
            self.event_types.push(event_type.clone());
        }
        let handlers = self.handlers.entry(event_type.clone()).or_default();

        if handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(RegistryError::DuplicateHandler {
                event_type,
                handler: handler.name().to_string(),
            });
        }

        debug!(
            event_type = %event_type,
            handler = handler.name(),
            domain = handler.domain(),
            "registered event handler"
        );
        handlers.push(handler);
        Ok(())
    }

    /// Subscribe one handler to several event types.
    pub fn register_many<I, S>(
        &mut self,
        event_types: I,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for event_type in event_types {
            self.register(event_type, handler.clone())?;
        }
        Ok(())
    }

    /// Handlers for `event_type` in registration order; empty when none.
    pub fn resolve(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.handlers.get(event_type).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map(Vec::len).unwrap_or(0)
    }

    /// Event types in first-registration order.
    pub fn event_types(&self) -> &[String] {
        &self.event_types
    }

    pub fn total_handlers(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty()
    }

    pub fn status(&self) -> RegistrationStatus {
        let registrations = self
            .handlers
            .iter()
            .map(|(event_type, handlers)| {
                let labels = handlers
                    .iter()
                    .map(|h| format!("{}.{}", h.domain(), h.name()))
                    .collect();
                (event_type.clone(), labels)
            })
            .collect();

        RegistrationStatus {
            total_event_types: self.event_types.len(),
            total_handlers: self.total_handlers(),
            registrations,
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event_types", &self.event_types)
            .field("total_handlers", &self.total_handlers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::handler::HandlerError;
    use crate::outcome::Outcome;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl EventHandler for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn domain(&self) -> &str {
            "payments"
        }

        async fn handle(&self, _event: &Event) -> Result<Outcome, HandlerError> {
            Ok(Outcome::success("ok"))
        }
    }

    #[test]
    fn test_resolve_keeps_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.register("a.b", Arc::new(Named("first"))).unwrap();
        registry.register("a.b", Arc::new(Named("second"))).unwrap();
        registry.register("c.d", Arc::new(Named("first"))).unwrap();

        let names: Vec<_> = registry
            .resolve("a.b")
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(registry.event_types(), ["a.b", "c.d"]);
        assert_eq!(registry.total_handlers(), 3);
    }

    #[test]
    fn test_resolve_unknown_type_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("nothing.here").is_empty());
        assert_eq!(registry.handler_count("nothing.here"), 0);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = HandlerRegistry::new();
        registry.register("a.b", Arc::new(Named("qr"))).unwrap();

        let err = registry.register("a.b", Arc::new(Named("qr"))).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateHandler { .. }));
        assert_eq!(registry.handler_count("a.b"), 1);
    }

    #[test]
    fn test_empty_event_type_rejected() {
        let mut registry = HandlerRegistry::new();
        let err = registry.register(" ", Arc::new(Named("qr"))).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyEventType));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_many_and_status() {
        let mut registry = HandlerRegistry::new();
        registry
            .register_many(["a.b", "c.d"], Arc::new(Named("audit")))
            .unwrap();

        let status = registry.status();
        assert_eq!(status.total_event_types, 2);
        assert_eq!(status.total_handlers, 2);
        assert_eq!(status.registrations["c.d"], vec!["payments.audit"]);
    }
}
