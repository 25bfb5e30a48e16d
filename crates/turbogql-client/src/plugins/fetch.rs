//! Terminal HTTP fetch plugin

use crate::plugins::context::OperationContext;
use crate::plugins::core::{ClientPlugin, PluginResult};
use crate::transport::HttpTransport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use turbogql_protocol::{CombinedError, OperationResult, OperationType, classify};

/// Sends each operation as one HTTP request and terminates with its result
///
/// Subscriptions are passed through untouched.
///
/// A body pre-built by an upstream plugin is sent unchanged; otherwise the
/// body is `{query, variables}` JSON.
#[derive(Debug, Clone)]
pub struct FetchPlugin {
    transport: Arc<dyn HttpTransport>,
}

impl FetchPlugin {
    /// Create a fetch plugin over a transport
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ClientPlugin for FetchPlugin {
    fn name(&self) -> &str {
        "fetch"
    }

    fn description(&self) -> Option<&str> {
        Some("Sends one HTTP request per operation")
    }

    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
        if context.kind() == OperationType::Subscription {
            return Ok(());
        }

        let request = context.http_request();
        debug!(
            "Fetching {} {} for {}",
            request.method, request.url, context.key
        );

        match self.transport.send(request).await {
            Ok(response) => {
                let response = response.into_parsed();
                let result = classify(&response);
                context.response = Some(response);
                context.use_result(result, true);
            }
            Err(e) => {
                warn!("Transport failed for {}: {}", context.key, e);
                context.use_result(
                    OperationResult::from_error(CombinedError::network(e.to_string(), None)),
                    true,
                );
            }
        }

        Ok(())
    }
}
