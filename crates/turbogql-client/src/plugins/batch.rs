//! Batching terminal plugin
//!
//! Operations arriving within a debounce window are coalesced into a single
//! HTTP request whose body is a JSON array of `{query, variables}` documents.
//! The server answers with an array in the same order, and each entry is
//! classified and delivered to the operation at that index.
//!
//! ```text
//! Idle --op--> Accumulating --op--> Accumulating (timer restarted)
//!                   |                     |
//!              timer fires      queue reaches max_operation_count
//!                   v                     v
//!                Flushing: swap queue, send one request, demultiplex
//! ```
//!
//! Every arrival bumps a generation counter; a timer only flushes when its
//! generation is still current, so a timer made stale by a newer arrival or
//! a forced flush does nothing.

use crate::plugins::context::OperationContext;
use crate::plugins::core::{ClientPlugin, PluginError, PluginResult};
use crate::transport::{HttpRequest, HttpTransport, RequestBody};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use turbogql_protocol::{CombinedError, OperationResult, OperationType, ParsedResponse, classify};

/// Batching configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Debounce window, restarted on every arrival
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Flush immediately once this many operations are queued
    pub max_operation_count: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10),
            max_operation_count: Some(10),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

type BatchReply = Result<ParsedResponse, CombinedError>;

struct QueuedOperation {
    body: Value,
    url: String,
    method: String,
    headers: HashMap<String, String>,
    reply: oneshot::Sender<BatchReply>,
}

#[derive(Default)]
struct BatchState {
    queue: Vec<QueuedOperation>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Plugin coalescing operations into batched HTTP requests
///
/// Subscriptions are passed through untouched.
#[derive(Clone)]
pub struct BatchPlugin {
    transport: Arc<dyn HttpTransport>,
    config: BatchConfig,
    state: Arc<Mutex<BatchState>>,
}

impl std::fmt::Debug for BatchPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPlugin")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("queued", &self.state.lock().queue.len())
            .finish()
    }
}

impl BatchPlugin {
    /// Create a batch plugin over a transport
    pub fn new(transport: Arc<dyn HttpTransport>, config: BatchConfig) -> Self {
        Self {
            transport,
            config,
            state: Arc::new(Mutex::new(BatchState::default())),
        }
    }

    /// Queue an operation; returns a batch to send when the queue is full
    fn enqueue(&self, operation: QueuedOperation) -> Option<Vec<QueuedOperation>> {
        let mut state = self.state.lock();
        state.queue.push(operation);
        state.generation += 1;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let full = self
            .config
            .max_operation_count
            .is_some_and(|max| state.queue.len() >= max);
        if full {
            return Some(std::mem::take(&mut state.queue));
        }

        let generation = state.generation;
        let plugin = self.clone();
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(plugin.config.timeout).await;
            let batch = {
                let mut state = plugin.state.lock();
                if state.generation != generation || state.queue.is_empty() {
                    return;
                }
                state.timer = None;
                std::mem::take(&mut state.queue)
            };
            Self::flush(Arc::clone(&plugin.transport), batch).await;
        }));
        None
    }

    async fn flush(transport: Arc<dyn HttpTransport>, batch: Vec<QueuedOperation>) {
        let Some(first) = batch.first() else {
            return;
        };

        debug!("Flushing batch of {} operations", batch.len());
        let body = Value::Array(batch.iter().map(|op| op.body.clone()).collect());
        let request = HttpRequest {
            url: first.url.clone(),
            method: first.method.clone(),
            headers: first.headers.clone(),
            body: Bytes::from(body.to_string()),
        };

        let response = match transport.send(request).await {
            Ok(response) => response.into_parsed(),
            Err(e) => {
                warn!("Batch transport failed: {}", e);
                Self::fail_all(batch, &CombinedError::network(e.to_string(), None));
                return;
            }
        };

        if !response.ok || response.body.is_none() {
            let error =
                CombinedError::network(response.status_text.clone(), Some(response.clone()));
            Self::fail_all(batch, &error);
            return;
        }

        let Some(items) = response.body.as_ref().and_then(Value::as_array) else {
            let error = CombinedError::network(
                "batch response is not a JSON array",
                Some(response.clone()),
            );
            Self::fail_all(batch, &error);
            return;
        };

        for (index, operation) in batch.into_iter().enumerate() {
            let reply = match items.get(index) {
                Some(item) => Ok(response.with_body(Some(item.clone()))),
                None => {
                    warn!("Batch response has no entry at index {}", index);
                    Err(CombinedError::network(
                        format!("batch response is missing entry {}", index),
                        Some(response.clone()),
                    ))
                }
            };
            // The caller may have gone away; nothing to deliver to then
            let _ = operation.reply.send(reply);
        }
    }

    fn fail_all(batch: Vec<QueuedOperation>, error: &CombinedError) {
        for operation in batch {
            let _ = operation.reply.send(Err(error.clone()));
        }
    }
}

#[async_trait]
impl ClientPlugin for BatchPlugin {
    fn name(&self) -> &str {
        "batch"
    }

    fn description(&self) -> Option<&str> {
        Some("Coalesces operations into batched HTTP requests")
    }

    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
        if context.kind() == OperationType::Subscription {
            return Ok(());
        }

        let body = match &context.request.body {
            None => context.default_body(),
            Some(RequestBody::Json(body)) => body.clone(),
            Some(RequestBody::Raw { .. }) => {
                return Err(PluginError::configuration(
                    "batched operations require a JSON request body",
                ));
            }
        };

        let (reply, receiver) = oneshot::channel();
        let queued = QueuedOperation {
            body,
            url: context.request.url.clone(),
            method: context.request.method.clone(),
            headers: context.request.headers.clone(),
            reply,
        };

        if let Some(batch) = self.enqueue(queued) {
            tokio::spawn(Self::flush(Arc::clone(&self.transport), batch));
        }

        match receiver.await {
            Ok(Ok(response)) => {
                let result = classify(&response);
                context.response = Some(response);
                context.use_result(result, true);
            }
            Ok(Err(error)) => {
                context.response = error.response.clone();
                context.use_result(OperationResult::from_error(error), true);
            }
            Err(_) => {
                return Err(PluginError::processing(
                    "batch was dropped before a response was delivered",
                ));
            }
        }

        Ok(())
    }
}
