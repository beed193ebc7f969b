//! Dashboard resources
//!
//! Thin, uniform adapters over the pagination engine for each list the
//! dashboard shows, plus the alert write surface.
//!
//! # Overview
//!
//! - `Resource` - Namespace, item type, filter type, defaults and path
//! - `ResourceQuery` - `load`, `fetch_next_page`, `refetch`, `set_filters`, `view`
//! - `ListView` - Snapshot with a per-resource projection of `items`
//! - `DataLayer` - One engine per resource over a shared API client
//! - `AlertActions` - Acknowledge and versioned update with conflict retry

mod alerts;
mod audit_logs;
mod events;
mod jobs;
mod layer;
mod query;

pub use alerts::{Alert, AlertActions, AlertFilters, AlertPatch, Alerts, AlertsView};
pub use audit_logs::{AuditLogEntry, AuditLogFilters, AuditLogs, AuditLogsView};
pub use events::{Event, EventFilters, Events, EventsView};
pub use jobs::{Job, JobFilters, Jobs, JobsView};
pub use layer::DataLayer;
pub use query::{ListView, Resource, ResourceQuery};

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// Resource selector for the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ResourceKind {
    Events,
    #[value(name = "audit-logs", alias = "audit_logs")]
    AuditLogs,
    Jobs,
    Alerts,
}

impl ResourceKind {
    /// Every resource
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Events,
        ResourceKind::AuditLogs,
        ResourceKind::Jobs,
        ResourceKind::Alerts,
    ];

    /// Cache namespace
    pub fn namespace(self) -> &'static str {
        match self {
            ResourceKind::Events => Events::NAMESPACE,
            ResourceKind::AuditLogs => AuditLogs::NAMESPACE,
            ResourceKind::Jobs => Jobs::NAMESPACE,
            ResourceKind::Alerts => Alerts::NAMESPACE,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.namespace() == normalized)
            .ok_or_else(|| Error::UnknownResource {
                name: s.to_string(),
            })
    }
}
