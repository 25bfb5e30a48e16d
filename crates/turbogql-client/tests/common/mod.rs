//! Shared test utilities: an in-memory recording transport

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use turbogql_client::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Route pipeline logs to the test output; set `RUST_LOG` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Responder =
    Box<dyn Fn(usize, &HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Transport that records every request and answers from a closure
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responder: Responder,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls())
            .finish()
    }
}

pub fn response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status,
        status_text: match status {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            _ => "",
        }
        .to_string(),
        headers: HashMap::from([(
            "content-type".to_string(),
            "application/json".to_string(),
        )]),
        body: Bytes::from(body.to_string()),
    }
}

impl MockTransport {
    /// Answer with the responder; it receives the 1-based call number
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(usize, &HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: None,
            gate: None,
        }
    }

    /// Always answer 200 with `body`
    pub fn json(body: Value) -> Self {
        Self::new(move |_, _| Ok(response(200, &body)))
    }

    /// Answer `{"data": {"call": n}}` for the n-th call
    pub fn counting() -> Self {
        Self::new(|call, _| {
            let body = json!({"data": {"call": call}});
            Ok(response(200, &body))
        })
    }

    /// Answer a batch with one `{"data": {"echo": variables}}` per entry
    pub fn echo_batch() -> Self {
        Self::new(|_, request| {
            let entries: Vec<Value> = serde_json::from_slice(&request.body).unwrap();
            let answers: Vec<Value> = entries
                .iter()
                .map(|entry| {
                    let variables = entry["variables"].clone();
                    json!({"data": {"echo": variables}})
                })
                .collect();
            Ok(response(200, &Value::Array(answers)))
        })
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block each call until a permit is added to `gate`
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.responder)(call, &request)
    }
}
