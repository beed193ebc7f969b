//! Data layer: one engine per resource over a shared API client

use super::alerts::{AlertActions, Alerts};
use super::audit_logs::AuditLogs;
use super::events::Events;
use super::jobs::Jobs;
use super::query::{Resource, ResourceQuery};
use crate::config::DashboardConfig;
use crate::conflict::ConflictRetryController;
use crate::error::{Error, Result};
use crate::http::{ApiClient, HttpPageFetcher};
use crate::pagination::CursorPaginationEngine;
use crate::staleness::DebouncedPreview;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

type Invalidator = Box<dyn Fn(&str) -> usize + Send + Sync>;

struct EngineSlot {
    engine: Arc<dyn Any + Send + Sync>,
    invalidate: Invalidator,
}

/// Entry point for reading and mutating dashboard resources.
///
/// Engines are created lazily, one per resource namespace, configured from
/// the pagination defaults and the resource's overrides.
pub struct DataLayer {
    config: DashboardConfig,
    client: Arc<ApiClient>,
    engines: Mutex<HashMap<&'static str, EngineSlot>>,
}

impl DataLayer {
    /// Build the API client from `config` and create the layer
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(ApiClient::new(config.client_config()?)?);
        Ok(Self::with_client(config, client))
    }

    /// Create the layer over an existing client
    pub fn with_client(config: DashboardConfig, client: Arc<ApiClient>) -> Self {
        Self {
            config,
            client,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Shared API client
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// The engine for resource `R`
    pub fn engine<R: Resource>(&self) -> Result<Arc<CursorPaginationEngine<R::Item>>> {
        let mut engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = engines.entry(R::NAMESPACE).or_insert_with(|| {
            let config = self
                .config
                .pagination
                .engine_config(self.config.resource(R::NAMESPACE), R::engine_config());
            debug!(namespace = R::NAMESPACE, max_pages = config.max_pages, "creating engine");
            let engine = Arc::new(CursorPaginationEngine::<R::Item>::new(config));
            let handle = Arc::clone(&engine);
            EngineSlot {
                engine,
                invalidate: Box::new(move |namespace| handle.invalidate(namespace)),
            }
        });
        Arc::clone(&slot.engine)
            .downcast::<CursorPaginationEngine<R::Item>>()
            .map_err(|_| {
                Error::Other(format!(
                    "namespace '{}' is registered with a different item type",
                    R::NAMESPACE
                ))
            })
    }

    /// HTTP fetcher for resource `R`
    pub fn fetcher<R: Resource>(&self) -> HttpPageFetcher<R::Item> {
        HttpPageFetcher::new(Arc::clone(&self.client), R::NAMESPACE, self.path::<R>())
    }

    /// List query for resource `R` with `filters`
    pub fn query<R: Resource>(&self, filters: R::Filters) -> Result<ResourceQuery<R>> {
        let limit = self
            .config
            .pagination
            .limit(self.config.resource(R::NAMESPACE), R::DEFAULT_LIMIT);
        ResourceQuery::new(self.engine::<R>()?, Arc::new(self.fetcher::<R>()), filters, limit)
    }

    /// Events list
    pub fn events(&self, filters: <Events as Resource>::Filters) -> Result<ResourceQuery<Events>> {
        self.query::<Events>(filters)
    }

    /// Audit log list
    pub fn audit_logs(
        &self,
        filters: <AuditLogs as Resource>::Filters,
    ) -> Result<ResourceQuery<AuditLogs>> {
        self.query::<AuditLogs>(filters)
    }

    /// Jobs list
    pub fn jobs(&self, filters: <Jobs as Resource>::Filters) -> Result<ResourceQuery<Jobs>> {
        self.query::<Jobs>(filters)
    }

    /// Alerts list
    pub fn alerts(&self, filters: <Alerts as Resource>::Filters) -> Result<ResourceQuery<Alerts>> {
        self.query::<Alerts>(filters)
    }

    /// A fresh alert mutation surface with its own conflict state
    pub fn alert_actions(&self) -> Result<AlertActions> {
        Ok(AlertActions::new(
            Arc::clone(&self.client),
            self.engine::<Alerts>()?,
            ConflictRetryController::new(self.config.conflict.max_retries),
            self.path::<Alerts>(),
        ))
    }

    /// Debounced preview using the configured quiet period
    pub fn preview<P, R, F, Fut>(&self, compute: F) -> DebouncedPreview<P, R>
    where
        P: Clone + Send + Sync + 'static,
        R: Send + Sync + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        DebouncedPreview::new(self.config.preview.debounce(), compute)
    }

    /// Invalidate every series under `namespace`
    pub fn invalidate(&self, namespace: &str) -> usize {
        let engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        engines
            .values()
            .map(|slot| (slot.invalidate)(namespace))
            .sum()
    }

    fn path<R: Resource>(&self) -> String {
        self.config
            .resource(R::NAMESPACE)
            .and_then(|r| r.path.clone())
            .unwrap_or_else(|| R::path().to_string())
    }
}

impl std::fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engines = self.engines.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DataLayer")
            .field("base_url", &self.config.base_url)
            .field("engines", &engines.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
