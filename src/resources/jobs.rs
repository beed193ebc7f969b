//! Background jobs

use super::query::{ListView, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Jobs list
#[derive(Debug, Clone, Copy, Default)]
pub struct Jobs;

impl Resource for Jobs {
    const NAMESPACE: &'static str = "jobs";
    type Item = Job;
    type Filters = JobFilters;

    fn path() -> &'static str {
        "/api/v1/jobs"
    }
}

/// A queued or running job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: String,
    pub queue: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Completion in `[0, 1]`, when reported
    #[serde(default)]
    pub progress: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Job list filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFilters {
    pub status: Option<String>,
    pub queue: Option<String>,
    pub model: Option<String>,
}

/// Jobs list view
pub type JobsView = ListView<Job>;

impl ListView<Job> {
    /// Flattened jobs, same `Arc` as `items`
    pub fn jobs(&self) -> &Arc<Vec<Job>> {
        &self.items
    }
}
