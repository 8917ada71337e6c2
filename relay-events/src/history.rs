//! Bounded log of published events

use crate::event::Event;
use crate::outcome::HandlerOutcome;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Default number of retained entries.
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// One published event and what its handlers reported.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub event: Arc<Event>,
    pub dispatch_time: DateTime<Utc>,
    /// `None` while handlers are still running.
    pub outcomes: Option<Vec<HandlerOutcome>>,
}

impl HistoryEntry {
    pub fn is_complete(&self) -> bool {
        self.outcomes.is_some()
    }
}

/// Ring buffer of recent events; the oldest entry is evicted first.
///
/// The lock is only held to push, update or copy entries, never while
/// handlers run.
#[derive(Debug)]
pub struct EventHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
    capacity: usize,
}

impl EventHistory {
    /// Create a history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Append an event whose dispatch is starting.
    pub fn record(&self, event: Arc<Event>) {
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(HistoryEntry {
            event,
            dispatch_time: Utc::now(),
            outcomes: None,
        });
    }

    /// Attach outcomes to the entry for `event_id`.
    ///
    /// Returns `false` when the entry was already evicted.
    pub fn complete(&self, event_id: Uuid, outcomes: Vec<HandlerOutcome>) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter_mut().rev().find(|e| e.event.id() == event_id) {
            Some(entry) => {
                entry.outcomes = Some(outcomes);
                true
            }
            None => false,
        }
    }

    /// The last `limit` entries, most recent last.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
