//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::DashboardConfig;
use crate::error::{Error, Result};
use crate::resources::{
    AlertActions, Alerts, AuditLogs, DataLayer, Events, Jobs, ListView, Resource, ResourceKind,
    ResourceQuery,
};
use crate::types::JsonValue;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        match &self.cli.command {
            Commands::List {
                resource,
                limit,
                pages,
                filters,
            } => {
                let layer = DataLayer::new(config)?;
                match resource {
                    ResourceKind::Events => {
                        Self::list::<Events>(&layer, *limit, *pages, filters).await
                    }
                    ResourceKind::AuditLogs => {
                        Self::list::<AuditLogs>(&layer, *limit, *pages, filters).await
                    }
                    ResourceKind::Jobs => Self::list::<Jobs>(&layer, *limit, *pages, filters).await,
                    ResourceKind::Alerts => {
                        Self::list::<Alerts>(&layer, *limit, *pages, filters).await
                    }
                }
            }
            Commands::AckAlert { id } => {
                let layer = DataLayer::new(config)?;
                Self::ack_alert(&layer.alert_actions()?, id).await
            }
            Commands::Config => {
                print!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
        }
    }

    /// Load the configuration file, if any, and apply command-line overrides
    fn load_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.cli.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(base_url) = &self.cli.base_url {
            config.base_url.clone_from(base_url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Fetch up to `pages` pages of `R` and print the resident items
    async fn list<R: Resource>(
        layer: &DataLayer,
        limit: Option<u32>,
        pages: usize,
        filters: &[String],
    ) -> Result<()> {
        let start = Instant::now();
        let mut query = layer.query::<R>(parse_filters(filters)?)?;
        if let Some(limit) = limit {
            query.set_limit(limit)?;
        }

        info!(key = %query.key(), pages, "listing {}", R::NAMESPACE);
        let (view, fetched) = page_through(&query, pages).await?;

        for item in view.items.iter() {
            output_message(&json!({
                "type": "RECORD",
                "resource": R::NAMESPACE,
                "record": item,
            }));
        }
        output_message(&json!({
            "type": "SUMMARY",
            "resource": R::NAMESPACE,
            "records": view.items.len(),
            "pages_fetched": fetched,
            "resident_pages": view.pages.len(),
            "total_count": view.total_count,
            "has_next_page": view.has_next_page,
            "duration_ms": start.elapsed().as_millis() as u64,
        }));
        Ok(())
    }

    /// Acknowledge an alert, retrying conflicts until the controller gives up
    async fn ack_alert(actions: &AlertActions, id: &str) -> Result<()> {
        let mut attempt = actions.acknowledge(id).await;
        loop {
            match attempt {
                Ok(alert) => {
                    output_message(&json!({
                        "type": "ALERT",
                        "alert": alert,
                    }));
                    return Ok(());
                }
                Err(e) if e.is_conflict() => {
                    warn!(alert = id, error = %e, "acknowledge conflicted, retrying");
                    attempt = match actions.retry_acknowledge(id).await {
                        Ok(Some(alert)) => Ok(alert),
                        Ok(None) => return Err(e),
                        Err(next) => Err(next),
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Load `query` and fetch next pages until `pages` pages were applied or
/// the list ends. Returns the final view and the number of applied pages.
pub(crate) async fn page_through<R: Resource>(
    query: &ResourceQuery<R>,
    pages: usize,
) -> Result<(ListView<R::Item>, usize)> {
    let mut view = query.load().await?;
    let mut applied = usize::from(!view.pages.is_empty());
    while applied < pages && view.has_next_page {
        if !query.fetch_next_page().await?.is_applied() {
            break;
        }
        view = query.view();
        applied += 1;
    }
    Ok((view, applied))
}

/// Build a typed filter record from `key=value` arguments
pub fn parse_filters<F: DeserializeOwned>(pairs: &[String]) -> Result<F> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::invalid_value("filter", format!("expected key=value, got '{pair}'"))
        })?;
        map.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
    }
    serde_json::from_value(JsonValue::Object(map))
        .map_err(|e| Error::invalid_value("filter", e.to_string()))
}

/// Output a message as one JSON line
fn output_message(msg: &Value) {
    println!("{}", serde_json::to_string(msg).unwrap_or_default());
}
