//! Client configuration types
//!
//! Defaults that every operation's request metadata starts from. The
//! configuration is plain data and can be deserialized from any serde
//! format by the embedding application.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use turbogql_protocol::CachePolicy;

/// Client-wide request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// GraphQL endpoint URL
    pub url: String,

    /// HTTP method for operations
    pub method: String,

    /// Headers sent with every operation (names lowercase)
    pub headers: HashMap<String, String>,

    /// Cache policy for queries that do not set one
    pub default_cache_policy: CachePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "/graphql".to_string(),
            method: "POST".to_string(),
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            default_cache_policy: CachePolicy::CacheFirst,
        }
    }
}
