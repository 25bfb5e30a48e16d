//! Client builder pattern for TurboGQL client construction
//!
//! Provides a fluent interface for configuring client options before creation.

use std::sync::Arc;

use super::config::ClientConfig;
use super::core::{Client, ClientInner};
use crate::error::ClientError;
use crate::plugins::{CachePlugin, ClientPlugin, DedupPlugin, FetchPlugin, PluginRegistry};
use crate::transport::{HttpTransport, ReqwestTransport};
use tracing::info;
use turbogql_protocol::CachePolicy;

/// Builder for configuring and creating clients
///
/// When no plugin is added explicitly the client gets the default chain
/// `[cache, dedup, fetch]` over the configured transport, or a
/// [`ReqwestTransport`] when none was given. Adding any plugin replaces
/// the default chain entirely; plugins run in the order they were added.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use turbogql_client::plugins::{BatchConfig, BatchPlugin, CachePlugin, DedupPlugin};
/// use turbogql_client::transport::ReqwestTransport;
/// use turbogql_client::{CachePolicy, ClientBuilder};
///
/// # fn example() -> Result<(), turbogql_client::ClientError> {
/// let transport = Arc::new(ReqwestTransport::new());
/// let client = ClientBuilder::new()
///     .with_url("https://api.example.com/graphql")
///     .with_header("authorization", "Bearer secret")
///     .with_cache_policy(CachePolicy::CacheAndNetwork)
///     .with_cache_plugin(CachePlugin::new())
///     .with_plugin(Arc::new(DedupPlugin::new()))
///     .with_plugin(Arc::new(BatchPlugin::new(transport, BatchConfig::default())))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    plugins: Option<Vec<Arc<dyn ClientPlugin>>>,
    cache: Option<CachePlugin>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // REQUEST DEFAULTS
    // ============================================================================

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the GraphQL endpoint URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Add a header sent with every operation
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the cache policy for queries that do not choose one
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.config.default_cache_policy = policy;
        self
    }

    // ============================================================================
    // PLUGINS
    // ============================================================================

    /// Transport used by the default fetch plugin
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append a plugin to the chain
    pub fn with_plugin(mut self, plugin: Arc<dyn ClientPlugin>) -> Self {
        self.plugins.get_or_insert_with(Vec::new).push(plugin);
        self
    }

    /// Append several plugins; an empty list still replaces the default chain
    pub fn with_plugins<I>(mut self, plugins: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ClientPlugin>>,
    {
        self.plugins.get_or_insert_with(Vec::new).extend(plugins);
        self
    }

    /// Append a cache plugin and let the client manage it
    ///
    /// [`Client::clear_cache`] and [`Client::clear_cache_tags`] act on this
    /// plugin.
    pub fn with_cache_plugin(mut self, cache: CachePlugin) -> Self {
        self.plugins
            .get_or_insert_with(Vec::new)
            .push(Arc::new(cache.clone()));
        self.cache = Some(cache);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the endpoint URL is blank
    /// or two plugins share a name.
    pub fn build(self) -> Result<Client, ClientError> {
        if self.config.url.trim().is_empty() {
            return Err(ClientError::configuration("endpoint URL must not be empty"));
        }

        let (plugins, cache) = match self.plugins {
            Some(plugins) => (plugins, self.cache),
            None => {
                let transport = self
                    .transport
                    .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));
                let cache = CachePlugin::new();
                let plugins: Vec<Arc<dyn ClientPlugin>> = vec![
                    Arc::new(cache.clone()),
                    Arc::new(DedupPlugin::new()),
                    Arc::new(FetchPlugin::new(transport)),
                ];
                (plugins, Some(cache))
            }
        };

        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry
                .register_plugin(plugin)
                .map_err(|e| ClientError::configuration(e.to_string()))?;
        }

        info!(
            "Building client for {} with plugins {:?}",
            self.config.url,
            registry.get_plugin_names()
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                registry: Arc::new(registry),
                cache,
            }),
        })
    }
}
