//! In-process event dispatch for approval-relay
//!
//! A webhook receiver normalizes each upstream notification into an
//! [`Event`] and hands it to the [`EventBus`]. The bus records it in a
//! bounded history, resolves the handlers subscribed to its type and runs
//! them all concurrently, one tokio task each.
//!
//! ## Features
//!
//! - **Fan-out** - every subscribed handler sees every event of its type
//! - **Fault isolation** - an error or panic in one handler becomes
//!   [`Outcome::Failed`] and never stops its siblings
//! - **Reports** - `publish` returns one outcome per handler, with timing
//! - **History** - ring buffer of recent events for diagnostics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay_events::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct AuditHandler;
//!
//! #[async_trait]
//! impl EventHandler for AuditHandler {
//!     fn name(&self) -> &str { "audit" }
//!
//!     async fn handle(&self, event: &Event) -> Result<Outcome, HandlerError> {
//!         match event.get_str("instance_code") {
//!             Some(code) => Ok(Outcome::success(format!("audited {code}"))),
//!             None => Ok(Outcome::skipped(MISSING_IDENTIFIER)),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::builder()
//!         .register("approval.instance.updated", Arc::new(AuditHandler))?
//!         .history_capacity(100)
//!         .build();
//!
//!     let payload = serde_json::json!({"instance_code": "I1"});
//!     let report = bus
//!         .publish_event(Event::from_json("approval.instance.updated", payload))
//!         .await;
//!
//!     assert_eq!(report.get("audit"), Some(&Outcome::success("audited I1")));
//!     Ok(())
//! }
//! ```
//!
//! ## Registration
//!
//! Handlers are registered once, before the bus is built. A handler may
//! subscribe to several event types and several handlers may share one;
//! names must be unique within an event type.
//!
//! ```rust,ignore
//! let mut registry = HandlerRegistry::new();
//! registry.register("approval.instance.updated", qr_handler)?;
//! registry.register("approval.instance.updated", alert_handler)?;
//! let bus = EventBus::new(registry);
//! ```

pub mod bus;
pub mod event;
pub mod handler;
pub mod history;
pub mod outcome;
pub mod registry;

pub use bus::{EventBus, EventBusBuilder, EventBusConfig};
pub use event::{Event, Payload};
pub use handler::{EventHandler, HandlerError};
pub use history::{DEFAULT_HISTORY_CAPACITY, EventHistory, HistoryEntry};
pub use outcome::{DUPLICATE, DispatchReport, HandlerOutcome, MISSING_IDENTIFIER, Outcome};
pub use registry::{HandlerRegistry, RegistrationStatus, RegistryError};
