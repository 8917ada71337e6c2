//! Handler outcomes and the per-publish dispatch report

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Skip reason used when the event carries no correlating identifier.
pub const MISSING_IDENTIFIER: &str = "missing identifier";

/// Skip reason used when the idempotency key is already marked.
pub const DUPLICATE: &str = "duplicate";

/// Result of one handler's attempt on one event.
///
/// Outcomes are for observability only; one handler's outcome never changes
/// what its siblings do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    /// Side effect performed
    Success(String),
    /// Event ineligible or already handled
    Skipped(String),
    /// Upstream failure or handler fault
    Failed(String),
}

impl Outcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Outcome::Success(detail.into())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Outcome::Skipped(reason.into())
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Outcome::Failed(error.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Detail, reason or error text.
    pub fn detail(&self) -> &str {
        match self {
            Outcome::Success(s) | Outcome::Skipped(s) | Outcome::Failed(s) => s,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Skipped(_) => "skipped",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status(), self.detail())
    }
}

/// Outcome of a named handler, with how long it ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerOutcome {
    pub handler: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Everything `publish` learned about one event.
///
/// Holds exactly one outcome per resolved handler, in registration order.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub event_id: Uuid,
    pub event_type: String,
    pub outcomes: Vec<HandlerOutcome>,
}

impl DispatchReport {
    pub fn new(event_id: Uuid, event_type: impl Into<String>, outcomes: Vec<HandlerOutcome>) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            outcomes,
        }
    }

    /// Outcome reported by the handler called `name`.
    pub fn get(&self, name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.handler == name)
            .map(|o| &o.outcome)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failed()).count()
    }

    /// Handler name to outcome.
    pub fn to_map(&self) -> BTreeMap<String, Outcome> {
        self.outcomes
            .iter()
            .map(|o| (o.handler.clone(), o.outcome.clone()))
            .collect()
    }
}
