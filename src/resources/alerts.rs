//! Alerts and alert mutations
//!
//! Alerts are versioned: an update carries the version the client last read
//! and the server answers 409 when someone else changed the alert first.
//! Mutations run through a [`ConflictRetryController`] and invalidate the
//! `alerts` namespace on success.

use super::query::{ListView, Resource};
use crate::conflict::{ConflictRetryController, ConflictState};
use crate::error::Result;
use crate::http::ApiClient;
use crate::pagination::CursorPaginationEngine;
use crate::types::Method;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Alerts list
#[derive(Debug, Clone, Copy, Default)]
pub struct Alerts;

impl Resource for Alerts {
    const NAMESPACE: &'static str = "alerts";
    type Item = Alert;
    type Filters = AlertFilters;

    fn path() -> &'static str {
        "/api/v1/alerts"
    }
}

/// A fired alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub status: String,
    pub severity: String,
    pub message: String,
    /// Optimistic-lock version
    pub version: u64,
    pub triggered_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Alert list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertFilters {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub rule_id: Option<String>,
}

/// Partial update of an alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Serialize)]
struct VersionedPatch<'a> {
    #[serde(flatten)]
    patch: &'a AlertPatch,
    version: u64,
}

/// Alerts list view
pub type AlertsView = ListView<Alert>;

impl ListView<Alert> {
    /// Flattened alerts, same `Arc` as `items`
    pub fn alerts(&self) -> &Arc<Vec<Alert>> {
        &self.items
    }
}

// ============================================================================
// Mutations
// ============================================================================

/// Write surface for alerts with conflict tracking
pub struct AlertActions {
    client: Arc<ApiClient>,
    engine: Arc<CursorPaginationEngine<Alert>>,
    controller: ConflictRetryController,
    path: String,
}

impl AlertActions {
    /// Create the surface. `path` is the alerts list path.
    pub fn new(
        client: Arc<ApiClient>,
        engine: Arc<CursorPaginationEngine<Alert>>,
        controller: ConflictRetryController,
        path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            engine,
            controller,
            path: path.into(),
        }
    }

    /// Acknowledge an alert
    pub async fn acknowledge(&self, id: &str) -> Result<Alert> {
        let alert = self.controller.run(|| self.send_acknowledge(id)).await?;
        self.applied(&alert);
        Ok(alert)
    }

    /// Retry a conflicted acknowledge; `None` once retries are exhausted
    pub async fn retry_acknowledge(&self, id: &str) -> Result<Option<Alert>> {
        let alert = self.controller.retry(|| self.send_acknowledge(id)).await?;
        if let Some(alert) = &alert {
            self.applied(alert);
        }
        Ok(alert)
    }

    /// Update an alert the client last read at `expected_version`
    pub async fn update(&self, id: &str, patch: &AlertPatch, expected_version: u64) -> Result<Alert> {
        let alert = self
            .controller
            .run(|| self.send_update(id, patch, expected_version))
            .await?;
        self.applied(&alert);
        Ok(alert)
    }

    /// Retry a conflicted update, usually with a refreshed `expected_version`
    pub async fn retry_update(
        &self,
        id: &str,
        patch: &AlertPatch,
        expected_version: u64,
    ) -> Result<Option<Alert>> {
        let alert = self
            .controller
            .retry(|| self.send_update(id, patch, expected_version))
            .await?;
        if let Some(alert) = &alert {
            self.applied(alert);
        }
        Ok(alert)
    }

    /// Dismiss the current conflict
    pub fn clear_conflict(&self) {
        self.controller.clear_conflict();
    }

    /// Current conflict state
    pub fn conflict_state(&self) -> ConflictState {
        self.controller.state()
    }

    /// The conflict controller
    pub fn controller(&self) -> &ConflictRetryController {
        &self.controller
    }

    async fn send_acknowledge(&self, id: &str) -> Result<Alert> {
        let path = format!("{}/{id}/acknowledge", self.path.trim_end_matches('/'));
        self.client
            .send_json(Method::POST, &path, &serde_json::json!({}))
            .await
    }

    async fn send_update(&self, id: &str, patch: &AlertPatch, version: u64) -> Result<Alert> {
        let path = format!("{}/{id}", self.path.trim_end_matches('/'));
        self.client
            .send_json(Method::PATCH, &path, &VersionedPatch { patch, version })
            .await
    }

    fn applied(&self, alert: &Alert) {
        let count = self.engine.invalidate(Alerts::NAMESPACE);
        debug!(alert = %alert.id, version = alert.version, invalidated = count, "alert updated");
    }
}

impl std::fmt::Debug for AlertActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertActions")
            .field("path", &self.path)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
