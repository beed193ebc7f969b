//! System events

use super::query::{ListView, Resource};
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Events list
#[derive(Debug, Clone, Copy, Default)]
pub struct Events;

impl Resource for Events {
    const NAMESPACE: &'static str = "events";
    type Item = Event;
    type Filters = EventFilters;

    fn path() -> &'static str {
        "/api/v1/events"
    }
}

/// A system event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub severity: String,
    pub source: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: JsonValue,
}

/// Event list filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventFilters {
    pub severity: Option<String>,
    pub source: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Free-text search over the message
    pub search: Option<String>,
}

impl EventFilters {
    #[must_use]
    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }
}

/// Events list view
pub type EventsView = ListView<Event>;

impl ListView<Event> {
    /// Flattened events, same `Arc` as `items`
    pub fn events(&self) -> &Arc<Vec<Event>> {
        &self.items
    }
}
