//! Common types used throughout dashfeed
//!
//! This module contains shared type definitions, type aliases,
//! and the identity types (`Filters`, `QueryKey`) every paginated
//! series is keyed by.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Opaque pagination cursor. Never inspected, only forwarded.
pub type Cursor = String;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Filters
// ============================================================================

/// Plain key/value filter record for a list query.
///
/// Keys are kept sorted so two filter sets with the same entries compare,
/// hash and serialize identically regardless of insertion order. Null values
/// are never stored: an absent filter and a `null` filter are the same query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, JsonValue>);

impl<'de> Deserialize<'de> for Filters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, JsonValue>::deserialize(deserializer)?;
        let mut filters = Self::new();
        for (key, value) in raw {
            filters.insert(key, value);
        }
        Ok(filters)
    }
}

impl Filters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build filters from any serializable struct or map.
    ///
    /// The value must serialize to a JSON object (or `null`, meaning no filters).
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            JsonValue::Null => Ok(Self::new()),
            JsonValue::Object(map) => {
                let mut filters = Self::new();
                for (key, value) in map {
                    filters.insert(key, value);
                }
                Ok(filters)
            }
            other => Err(Error::invalid_value(
                "filters",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Add a filter (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a filter. Inserting `null` removes the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        let key = key.into();
        match value.into() {
            JsonValue::Null => {
                self.0.remove(&key);
            }
            value => {
                self.0.insert(key, value);
            }
        }
    }

    /// Get a filter value
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Iterate over filters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no filters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON encoding, stable across insertion order
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Flatten into query-string pairs.
    ///
    /// Strings are passed verbatim, arrays are comma-joined and nested
    /// objects are sent as JSON.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), query_value(value)))
            .collect()
    }
}

impl Hash for Filters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

fn query_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => items
            .iter()
            .map(query_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

// ============================================================================
// Query Key
// ============================================================================

/// Identity of one paginated series: `(namespace, "infinite", { filters, limit })`.
///
/// Two keys are equal iff namespace, limit and filters are deep-equal, so a
/// filter or limit change always addresses a fresh series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    namespace: String,
    limit: u32,
    filters: Filters,
}

impl QueryKey {
    /// Create a key, rejecting a zero limit
    pub fn new(namespace: impl Into<String>, filters: Filters, limit: u32) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidLimit { limit });
        }
        Ok(Self {
            namespace: namespace.into(),
            limit,
            filters,
        })
    }

    /// Resource namespace (e.g. "events", "alerts")
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Page size, always at least 1
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Filters applied to the list
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Check whether this key belongs to a namespace
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/infinite/limit={}/{}",
            self.namespace,
            self.limit,
            self.filters.canonical()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let patch: reqwest::Method = Method::PATCH.into();
        assert_eq!(reqwest::Method::PATCH, patch);
    }

    #[test]
    fn test_backoff_serde() {
        let backoff: BackoffType = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(backoff, BackoffType::Linear);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }

    #[test]
    fn test_filters_insertion_order_irrelevant() {
        let a = Filters::new().with("severity", "high").with("source", "gpu-0");
        let b = Filters::new().with("source", "gpu-0").with("severity", "high");
        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_filters_null_removes() {
        let filters = Filters::new()
            .with("status", "open")
            .with("status", JsonValue::Null);
        assert!(filters.is_empty());
    }

    #[test]
    fn test_filters_deserialize_drops_nulls() {
        let filters: Filters =
            serde_json::from_value(json!({"status": null, "queue": "training"})).unwrap();
        assert_eq!(filters, Filters::new().with("queue", "training"));

        let empty: Filters = serde_json::from_value(json!({"status": null})).unwrap();
        assert_eq!(empty, Filters::new());
        assert_eq!(empty.canonical(), "{}");
    }

    #[test]
    fn test_filters_from_serializable() {
        #[derive(Serialize)]
        struct Params {
            status: Option<String>,
            queue: Option<String>,
            tags: Vec<String>,
        }

        let filters = Filters::from_serializable(&Params {
            status: Some("running".into()),
            queue: None,
            tags: vec!["a".into(), "b".into()],
        })
        .unwrap();

        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get("status"), Some(&json!("running")));
        assert_eq!(
            filters.to_query_pairs(),
            vec![
                ("status".to_string(), "running".to_string()),
                ("tags".to_string(), "a,b".to_string()),
            ]
        );

        assert!(Filters::from_serializable(&42).is_err());
        assert!(Filters::from_serializable(&()).unwrap().is_empty());
    }

    #[test]
    fn test_query_key_equality() {
        let filters = Filters::new().with("severity", "high");
        let a = QueryKey::new("events", filters.clone(), 50).unwrap();
        let b = QueryKey::new("events", filters.clone(), 50).unwrap();
        let other_limit = QueryKey::new("events", filters.clone(), 25).unwrap();
        let other_ns = QueryKey::new("alerts", filters, 50).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.namespace(), "events");
        assert_eq!(a.limit(), 50);
        assert_eq!(a.filters(), &Filters::new().with("severity", "high"));
        assert_ne!(a, other_limit);
        assert_ne!(a, other_ns);
        assert!(a.in_namespace("events"));
        assert!(!a.in_namespace("alerts"));
    }

    #[test]
    fn test_query_key_rejects_zero_limit() {
        let err = QueryKey::new("jobs", Filters::new(), 0).unwrap_err();
        assert!(matches!(err, Error::InvalidLimit { limit: 0 }));
    }

    #[test]
    fn test_query_key_display() {
        let key = QueryKey::new("alerts", Filters::new().with("status", "open"), 10).unwrap();
        assert_eq!(
            key.to_string(),
            "alerts/infinite/limit=10/{\"status\":\"open\"}"
        );
    }
}
