//! Subscription pass-through plugin
//!
//! Wire-level subscription transports are outside this crate. An injected
//! [`SubscriptionForwarder`] opens the stream and this plugin hands it to
//! the caller as the operation's terminal outcome. Dropping the stream
//! unsubscribes.

use crate::plugins::context::{OperationContext, ResultStream};
use crate::plugins::core::{ClientPlugin, PluginResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use turbogql_protocol::OperationType;

/// The document forwarded to a subscription transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRequest {
    /// Canonical query text
    pub query: String,
    /// Variables, `{}` when none were given
    pub variables: Value,
}

/// Opens subscription streams
#[async_trait]
pub trait SubscriptionForwarder: Send + Sync {
    /// Start a subscription
    ///
    /// # Errors
    ///
    /// Returns a plugin error when the subscription could not be started.
    async fn forward(&self, request: SubscriptionRequest) -> PluginResult<ResultStream>;
}

/// Plugin routing subscriptions to a [`SubscriptionForwarder`]
#[derive(Clone)]
pub struct SubscriptionPlugin {
    forwarder: Arc<dyn SubscriptionForwarder>,
}

impl fmt::Debug for SubscriptionPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionPlugin").finish_non_exhaustive()
    }
}

impl SubscriptionPlugin {
    /// Create the plugin around a forwarder
    pub fn new(forwarder: Arc<dyn SubscriptionForwarder>) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl ClientPlugin for SubscriptionPlugin {
    fn name(&self) -> &str {
        "subscriptions"
    }

    fn description(&self) -> Option<&str> {
        Some("Forwards subscriptions to an external stream transport")
    }

    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
        if context.kind() != OperationType::Subscription {
            return Ok(());
        }

        let request = SubscriptionRequest {
            query: context
                .operation
                .normalized_query()
                .unwrap_or(&context.operation.query)
                .to_string(),
            variables: context
                .operation
                .variables
                .clone()
                .unwrap_or_else(|| Value::Object(Default::default())),
        };

        debug!("Forwarding subscription {}", context.key);
        let stream = self.forwarder.forward(request).await?;
        context.use_stream(stream);
        Ok(())
    }
}
