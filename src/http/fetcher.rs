//! HTTP-backed page fetcher

use super::client::ApiClient;
use crate::error::{Error, Result};
use crate::pagination::{Page, PageFetcher, PageRequest};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fetches pages of `T` from a cursor-paginated list endpoint.
///
/// Query parameters: `limit`, `cursor` when continuing, `include_total=true`
/// on the first page only, then one parameter per filter.
pub struct HttpPageFetcher<T> {
    client: Arc<ApiClient>,
    namespace: String,
    path: String,
    _items: PhantomData<fn() -> T>,
}

impl<T> HttpPageFetcher<T> {
    /// Create a fetcher for the list at `path`
    pub fn new(client: Arc<ApiClient>, namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            path: path.into(),
            _items: PhantomData,
        }
    }

    /// Endpoint path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters for one page request
    pub fn query_params(request: &PageRequest) -> Vec<(String, String)> {
        let mut params = vec![("limit".to_string(), request.limit.to_string())];
        if let Some(cursor) = &request.cursor {
            params.push(("cursor".to_string(), cursor.clone()));
        }
        if request.include_total {
            params.push(("include_total".to_string(), "true".to_string()));
        }
        params.extend(request.filters.to_query_pairs());
        params
    }
}

impl<T> Clone for HttpPageFetcher<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            namespace: self.namespace.clone(),
            path: self.path.clone(),
            _items: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for HttpPageFetcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("namespace", &self.namespace)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> PageFetcher<T> for HttpPageFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<Page<T>> {
        let params = Self::query_params(&request);
        self.client
            .get_json(&self.path, &params)
            .await
            .map_err(|e| match e {
                Error::JsonParse(err) => {
                    Error::fetch(&self.namespace, format!("malformed page: {err}"))
                }
                other => other,
            })
    }
}
