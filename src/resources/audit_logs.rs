//! Audit log entries

use super::query::{ListView, Resource};
use crate::types::JsonValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audit log list
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogs;

impl Resource for AuditLogs {
    const NAMESPACE: &'static str = "audit_logs";
    type Item = AuditLogEntry;
    type Filters = AuditLogFilters;

    fn path() -> &'static str {
        "/api/v1/audit-logs"
    }
}

/// One recorded action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: JsonValue,
}

/// Audit log filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditLogFilters {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Audit log list view
pub type AuditLogsView = ListView<AuditLogEntry>;

impl ListView<AuditLogEntry> {
    /// Flattened entries, same `Arc` as `items`
    pub fn logs(&self) -> &Arc<Vec<AuditLogEntry>> {
        &self.items
    }
}
