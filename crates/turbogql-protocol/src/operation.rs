//! Operation description types
//!
//! An [`Operation`] is immutable once handed to a client. The client attaches
//! the derived key and resolves the cache policy on its own context object,
//! so nothing here is rewritten during execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Kind of GraphQL operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Read-only query, eligible for caching and deduplication
    Query,
    /// Side-effecting mutation, never cached or deduplicated
    Mutation,
    /// Long-lived subscription, delivered as a stream
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Query => write!(f, "query"),
            OperationType::Mutation => write!(f, "mutation"),
            OperationType::Subscription => write!(f, "subscription"),
        }
    }
}

/// How the cache plugin treats a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Serve from cache when present, otherwise go to the network
    #[default]
    CacheFirst,
    /// Serve the cached value immediately, then refresh from the network
    CacheAndNetwork,
    /// Always go to the network; the result is still written to the cache
    NetworkOnly,
    /// Never go to the network; a miss yields an empty result
    CacheOnly,
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CachePolicy::CacheFirst => "cache-first",
            CachePolicy::CacheAndNetwork => "cache-and-network",
            CachePolicy::NetworkOnly => "network-only",
            CachePolicy::CacheOnly => "cache-only",
        };
        f.write_str(name)
    }
}

/// A GraphQL operation as submitted by a caller
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use turbogql_protocol::{CachePolicy, Operation, OperationType};
///
/// let op = Operation::query("query Posts { posts { id title } }")
///     .with_variables(json!({"first": 10}))
///     .with_cache_policy(CachePolicy::CacheAndNetwork)
///     .with_tags(["posts"]);
///
/// assert_eq!(op.kind, OperationType::Query);
/// assert_eq!(op.tags, vec!["posts".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// GraphQL document text, opaque to the pipeline
    pub query: String,

    /// Operation variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    /// Operation kind
    #[serde(rename = "type")]
    pub kind: OperationType,

    /// Per-call cache policy, overriding the client default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy: Option<CachePolicy>,

    /// Tags attached to the cached result of a query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Tags whose cache entries a successful mutation evicts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear_cache_tags: Vec<String>,

    /// Extra request headers merged over the client defaults
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Operation {
    /// Create an operation of the given kind
    pub fn new(kind: OperationType, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            kind,
            cache_policy: None,
            tags: Vec::new(),
            clear_cache_tags: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Create a query operation
    pub fn query(query: impl Into<String>) -> Self {
        Self::new(OperationType::Query, query)
    }

    /// Create a mutation operation
    pub fn mutation(query: impl Into<String>) -> Self {
        Self::new(OperationType::Mutation, query)
    }

    /// Create a subscription operation
    pub fn subscription(query: impl Into<String>) -> Self {
        Self::new(OperationType::Subscription, query)
    }

    /// Set the operation variables
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Set the per-call cache policy
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    /// Tag the cached result of this query
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Evict these tags from the cache when this mutation succeeds
    pub fn with_clear_cache_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clear_cache_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Add a request header for this call only
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The canonical query text, or `None` when the query is blank
    pub fn normalized_query(&self) -> Option<&str> {
        normalize_query(&self.query)
    }
}

/// Canonicalize query text
///
/// Surrounding whitespace is dropped; interior text is left untouched so
/// string literals inside the document keep their exact content. Blank
/// documents have no canonical form.
pub fn normalize_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
