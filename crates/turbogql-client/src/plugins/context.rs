//! Per-operation state threaded through the plugin chain

use crate::client::config::ClientConfig;
use crate::transport::{HttpRequest, RequestBody};
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::watch;
use tracing::debug;
use turbogql_protocol::{
    CachePolicy, Operation, OperationKey, OperationResult, OperationType, ParsedResponse,
};

use super::core::PluginResult;

/// Stream of results produced by a subscription
pub type ResultStream = BoxStream<'static, OperationResult>;

/// Callback run once the operation's final result is known
///
/// Receives the final result and the response metadata recorded by the
/// terminal plugin, if any.
pub type AfterQueryHook =
    Box<dyn FnOnce(&OperationResult, Option<&ParsedResponse>) -> PluginResult<()> + Send>;

/// Outgoing request metadata, mutable by upstream plugins
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// Endpoint URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Pre-built body; when `None` the terminal plugin sends `{query, variables}`
    pub body: Option<RequestBody>,
}

/// Single-slot holder for an operation's result
///
/// Overwrite rules:
/// - every write before termination replaces the slot and is published to
///   the caller and to any subscriber
/// - writes after termination only replace what after-query hooks see
#[derive(Debug)]
pub struct ResultSink {
    published: watch::Sender<Option<OperationResult>>,
    current: Option<OperationResult>,
    terminated: bool,
}

impl Default for ResultSink {
    fn default() -> Self {
        let (published, _) = watch::channel(None);
        Self {
            published,
            current: None,
            terminated: false,
        }
    }
}

impl ResultSink {
    /// Record a result
    pub fn set(&mut self, result: OperationResult, terminate: bool) {
        if self.terminated {
            debug!("Result written after termination, visible to after-query hooks only");
            self.current = Some(result);
            return;
        }

        self.current = Some(result.clone());
        self.published.send_replace(Some(result));
        if terminate {
            self.terminated = true;
        }
    }

    /// Receiver of published results, with the current value already seen
    pub fn subscribe(&self) -> watch::Receiver<Option<OperationResult>> {
        self.published.subscribe()
    }

    /// Latest result, including post-termination writes
    pub fn current(&self) -> Option<&OperationResult> {
        self.current.as_ref()
    }

    /// Whether a plugin requested termination
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Mutable per-operation state passed to every plugin
pub struct OperationContext {
    /// The submitted operation
    pub operation: Operation,
    /// Operation identity used by the cache and deduplicator
    pub key: OperationKey,
    /// Cache policy resolved from the call site and the client default
    pub cache_policy: CachePolicy,
    /// Outgoing request metadata
    pub request: RequestOptions,
    /// Response metadata recorded by the terminal plugin
    pub response: Option<ParsedResponse>,
    sink: ResultSink,
    stream: Option<ResultStream>,
    after_query: Vec<AfterQueryHook>,
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("operation", &self.operation)
            .field("key", &self.key)
            .field("cache_policy", &self.cache_policy)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("sink", &self.sink)
            .field("has_stream", &self.stream.is_some())
            .field("after_query", &self.after_query.len())
            .finish()
    }
}

impl OperationContext {
    /// Build the context for an operation using client defaults
    pub fn new(operation: Operation, config: &ClientConfig) -> Self {
        let key = OperationKey::of(&operation);
        let cache_policy = operation
            .cache_policy
            .unwrap_or(config.default_cache_policy);

        let mut headers = config.headers.clone();
        headers.extend(
            operation
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        Self {
            request: RequestOptions {
                url: config.url.clone(),
                method: config.method.clone(),
                headers,
                body: None,
            },
            operation,
            key,
            cache_policy,
            response: None,
            sink: ResultSink::default(),
            stream: None,
            after_query: Vec::new(),
        }
    }

    /// Operation kind
    pub fn kind(&self) -> OperationType {
        self.operation.kind
    }

    /// Produce the operation's result
    ///
    /// With `terminate` set, no further plugins run for this operation.
    pub fn use_result(&mut self, result: OperationResult, terminate: bool) {
        debug!(
            "Operation {} produced a result (terminate: {})",
            self.key, terminate
        );
        self.sink.set(result, terminate);
    }

    /// Produce a subscription stream; always terminates
    pub fn use_stream(&mut self, stream: ResultStream) {
        debug!("Operation {} produced a stream", self.key);
        self.stream = Some(stream);
        self.sink.terminated = true;
    }

    /// Register a hook to run with the final result
    pub fn after_query(&mut self, hook: AfterQueryHook) {
        self.after_query.push(hook);
    }

    /// Observe results published for this operation from now on
    pub fn subscribe_results(&self) -> watch::Receiver<Option<OperationResult>> {
        self.sink.subscribe()
    }

    /// Latest result
    pub fn current_result(&self) -> Option<&OperationResult> {
        self.sink.current()
    }

    /// Whether a result or stream has been produced
    pub fn has_outcome(&self) -> bool {
        self.sink.current().is_some() || self.stream.is_some()
    }

    /// Whether a plugin requested termination
    pub fn is_terminated(&self) -> bool {
        self.sink.is_terminated()
    }

    pub(crate) fn take_stream(&mut self) -> Option<ResultStream> {
        self.stream.take()
    }

    /// The `{query, variables}` document sent when no body was pre-built
    pub fn default_body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "query".to_string(),
            Value::String(
                self.operation
                    .normalized_query()
                    .unwrap_or(&self.operation.query)
                    .to_string(),
            ),
        );
        if let Some(variables) = &self.operation.variables {
            body.insert("variables".to_string(), variables.clone());
        }
        Value::Object(body)
    }

    /// Resolve the request metadata into an HTTP request
    pub fn http_request(&self) -> HttpRequest {
        let body = self
            .request
            .body
            .clone()
            .unwrap_or_else(|| RequestBody::Json(self.default_body()));

        let mut headers = self.request.headers.clone();
        if let Some(content_type) = body.content_type() {
            headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
            headers.insert("content-type".to_string(), content_type.to_string());
        }

        HttpRequest {
            url: self.request.url.clone(),
            method: self.request.method.clone(),
            headers,
            body: body.to_bytes(),
        }
    }

    /// Run every after-query hook in registration order
    ///
    /// Hook failures are logged and do not stop later hooks.
    pub(crate) fn run_after_query(&mut self) {
        let hooks = std::mem::take(&mut self.after_query);
        let Some(result) = self.sink.current() else {
            return;
        };

        for (index, hook) in hooks.into_iter().enumerate() {
            if let Err(e) = hook(result, self.response.as_ref()) {
                tracing::error!(
                    "After-query hook {} failed for operation {}: {}",
                    index, self.key, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::PluginError;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn context(operation: Operation) -> OperationContext {
        OperationContext::new(operation, &ClientConfig::default())
    }

    #[test]
    fn test_policy_resolution() {
        let config = ClientConfig {
            default_cache_policy: CachePolicy::NetworkOnly,
            ..ClientConfig::default()
        };
        let ctx = OperationContext::new(Operation::query("{ a }"), &config);
        assert_eq!(ctx.cache_policy, CachePolicy::NetworkOnly);

        let op = Operation::query("{ a }")
            .with_cache_policy(CachePolicy::CacheOnly);
        let ctx = OperationContext::new(op, &config);
        assert_eq!(ctx.cache_policy, CachePolicy::CacheOnly);
    }

    #[test]
    fn test_operation_headers_override_defaults() {
        let op = Operation::query("{ a }")
            .with_header("content-type", "application/graphql+json");
        let ctx = context(op);
        assert_eq!(
            ctx.request.headers.get("content-type").map(String::as_str),
            Some("application/graphql+json")
        );
        assert_eq!(ctx.request.method, "POST");
    }

    #[test]
    fn test_sink_overwrite_semantics() {
        let mut ctx = context(Operation::query("{ a }"));
        let rx = ctx.subscribe_results();

        ctx.use_result(OperationResult::from_data(json!(1)), false);
        assert!(!ctx.is_terminated());
        ctx.use_result(OperationResult::from_data(json!(2)), true);
        assert!(ctx.is_terminated());
        assert_eq!(*rx.borrow(), Some(OperationResult::from_data(json!(2))));

        // Hidden from subscribers, visible to hooks
        ctx.use_result(OperationResult::from_data(json!(3)), false);
        assert_eq!(*rx.borrow(), Some(OperationResult::from_data(json!(2))));
        assert_eq!(
            ctx.current_result(),
            Some(&OperationResult::from_data(json!(3)))
        );
    }

    #[test]
    fn test_after_query_hooks_run_in_order_and_survive_failures() {
        let mut ctx = context(Operation::query("{ a }"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        ctx.after_query(Box::new(move |result, _| {
            let line = format!("first:{}", result.data.as_ref().unwrap());
            first.lock().unwrap().push(line);
            Err(PluginError::processing("boom"))
        }));
        let second = Arc::clone(&seen);
        ctx.after_query(Box::new(move |_, response| {
            let line = format!("second:{}", response.is_some());
            second.lock().unwrap().push(line);
            Ok(())
        }));

        ctx.use_result(OperationResult::from_data(json!("x")), true);
        ctx.run_after_query();

        assert_eq!(*seen.lock().unwrap(), vec!["first:\"x\"", "second:false"]);
    }

    #[test]
    fn test_default_body_uses_normalized_query() {
        let variables = json!({"id": 1});
        let op = Operation::query("  { a }  ").with_variables(variables);
        assert_eq!(
            context(op).default_body(),
            json!({"query": "{ a }", "variables": {"id": 1}})
        );

        let ctx = context(Operation::query("{ a }"));
        assert_eq!(ctx.default_body(), json!({"query": "{ a }"}));
    }

    #[test]
    fn test_raw_body_overrides_content_type() {
        let mut ctx = context(Operation::mutation("mutation { upload }"));
        ctx.request.body = Some(RequestBody::Raw {
            content_type: "multipart/form-data; boundary=b".to_string(),
            bytes: bytes::Bytes::from_static(b"--b--"),
        });

        let request = ctx.http_request();
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("multipart/form-data; boundary=b")
        );
        assert_eq!(request.body, bytes::Bytes::from_static(b"--b--"));
    }
}
