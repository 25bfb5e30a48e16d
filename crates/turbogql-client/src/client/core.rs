//! Core Client implementation: the operation execution pipeline
//!
//! # Execution
//!
//! 1. Build an [`OperationContext`] (key, resolved cache policy, request
//!    defaults).
//! 2. Run plugins in order until one produces a result.
//! 3. Return that result to the caller immediately.
//! 4. If the producing plugin did not terminate, the remaining plugins run
//!    in a background task, then the after-query hooks run with the final
//!    result. When nothing is left to run the hooks run before returning.
//!
//! Failures in step 4 are logged and never reach the caller.
//!
//! # Architecture
//!
//! `Client` is a cheaply-cloneable Arc wrapper; all clones share the plugin
//! chain and therefore the cache, pending-query table and batch queue.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error};
use turbogql_protocol::{Operation, OperationResult, OperationType};

use super::builder::ClientBuilder;
use super::config::ClientConfig;
use crate::error::ClientError;
use crate::plugins::{CachePlugin, OperationContext, PluginRegistry, ResultStream};

/// Later caller-visible results of one execution
pub type ResultUpdates = watch::Receiver<Option<OperationResult>>;

/// Shared client state
pub(super) struct ClientInner {
    pub(super) config: ClientConfig,
    pub(super) registry: Arc<PluginRegistry>,
    pub(super) cache: Option<CachePlugin>,
}

/// GraphQL client driving operations through its plugin chain
///
/// # Examples
///
/// ```rust,no_run
/// use serde_json::json;
/// use turbogql_client::{Client, Operation};
///
/// # async fn example() -> Result<(), turbogql_client::ClientError> {
/// let client = Client::new("https://api.example.com/graphql")?;
///
/// let result = client
///     .execute(Operation::query("query ($id: ID!) { post(id: $id) { title } }")
///         .with_variables(json!({"id": 1}))
///         .with_tags(["posts"]))
///     .await?;
///
/// match result.error {
///     Some(error) => eprintln!("{error}"),
///     None => println!("{:?}", result.data),
/// }
///
/// // Refetch everything tagged "posts" on the next query
/// client.clear_cache_tags(["posts"]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("plugins", &self.inner.registry.get_plugin_names())
            .finish()
    }
}

impl Client {
    /// Client for `url` with the default plugin chain
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] when the URL is blank.
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        ClientBuilder::new().with_url(url).build()
    }

    /// Start configuring a client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client-wide request defaults
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The plugin chain
    pub fn plugins(&self) -> &PluginRegistry {
        &self.inner.registry
    }

    /// Execute a query or mutation
    ///
    /// # Errors
    ///
    /// - [`ClientError::MissingQuery`] for blank query text
    /// - [`ClientError::NoResult`] when no plugin produced a result
    /// - [`ClientError::Plugin`] when a plugin failed before a result existed
    /// - [`ClientError::UnexpectedStream`] when the operation produced a stream
    pub async fn execute(&self, operation: Operation) -> Result<OperationResult, ClientError> {
        self.execute_with_updates(operation)
            .await
            .map(|(result, _)| result)
    }

    /// Execute a query built from text and variables
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn execute_query(
        &self,
        query: impl Into<String>,
        variables: Option<Value>,
    ) -> Result<OperationResult, ClientError> {
        self.execute(with_variables(Operation::query(query), variables))
            .await
    }

    /// Execute a mutation built from text and variables
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn execute_mutation(
        &self,
        query: impl Into<String>,
        variables: Option<Value>,
    ) -> Result<OperationResult, ClientError> {
        self.execute(with_variables(Operation::mutation(query), variables))
            .await
    }

    /// Execute and keep observing the result
    ///
    /// The receiver yields results published after the first one, e.g. the
    /// network refresh of a `cache-and-network` query.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`].
    pub async fn execute_with_updates(
        &self,
        operation: Operation,
    ) -> Result<(OperationResult, ResultUpdates), ClientError> {
        let mut context = self.start(operation)?;
        let resume_at = self.inner.registry.run_until_result(&mut context).await?;

        if context.take_stream().is_some() {
            return Err(ClientError::UnexpectedStream);
        }
        let Some(result) = context.current_result().cloned() else {
            error!("No plugin produced a result for operation {}", context.key);
            return Err(ClientError::NoResult);
        };

        let updates = context.subscribe_results();
        self.finish(context, resume_at);
        Ok((result, updates))
    }

    /// Start a subscription
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotSubscription`] for queries and mutations
    /// - [`ClientError::NoResult`] when no plugin produced a stream
    /// - [`ClientError::Plugin`] when a plugin or the forwarder failed
    pub async fn subscribe(&self, operation: Operation) -> Result<ResultStream, ClientError> {
        if operation.kind != OperationType::Subscription {
            return Err(ClientError::NotSubscription);
        }

        let mut context = self.start(operation)?;
        self.inner.registry.run_until_result(&mut context).await?;
        context.take_stream().ok_or(ClientError::NoResult)
    }

    /// Remove every cached result
    pub fn clear_cache(&self) {
        match &self.inner.cache {
            Some(cache) => cache.clear(),
            None => debug!("clear_cache called on a client without a managed cache"),
        }
    }

    /// Remove cached results carrying any of `tags`; returns the eviction count
    pub fn clear_cache_tags<I, S>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &self.inner.cache {
            Some(cache) => cache.clear_tags(tags),
            None => {
                debug!("clear_cache_tags called on a client without a managed cache");
                0
            }
        }
    }

    fn start(&self, operation: Operation) -> Result<OperationContext, ClientError> {
        if operation.normalized_query().is_none() {
            return Err(ClientError::MissingQuery);
        }

        let context = OperationContext::new(operation, &self.inner.config);
        debug!(
            "Executing {} {} ({})",
            context.kind(),
            context.key,
            context.cache_policy
        );
        Ok(context)
    }

    fn finish(&self, mut context: OperationContext, resume_at: usize) {
        if context.is_terminated() || resume_at >= self.inner.registry.plugin_count() {
            context.run_after_query();
            return;
        }

        let registry = Arc::clone(&self.inner.registry);
        tokio::spawn(async move {
            if let Err(e) = registry.run_remaining(resume_at, &mut context).await {
                error!(
                    "Background plugin pass failed for operation {}: {}",
                    context.key, e
                );
            }
            context.run_after_query();
        });
    }
}

fn with_variables(operation: Operation, variables: Option<Value>) -> Operation {
    match variables {
        Some(variables) => operation.with_variables(variables),
        None => operation,
    }
}
