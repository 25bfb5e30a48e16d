//! HTTP transport abstraction
//!
//! The fetch and batch plugins talk to the network only through
//! [`HttpTransport`]. [`ReqwestTransport`] is the default implementation;
//! tests and embedders can supply their own.

mod http;

pub use http::ReqwestTransport;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use turbogql_protocol::{ParsedResponse, parse_response};

/// Errors raised by a transport before a response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The request could not be built or sent
    #[error("{message}")]
    Request { message: String },

    /// The response body could not be read
    #[error("{message}")]
    Body { message: String },
}

impl TransportError {
    /// Create a request error
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Create a body error
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }
}

/// Outgoing request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document, sent as `application/json`
    Json(Value),

    /// Pre-encoded body, sent unchanged (e.g. a multipart upload form)
    Raw {
        /// Content type to send with the body
        content_type: String,
        /// Encoded bytes
        bytes: Bytes,
    },
}

impl RequestBody {
    /// Content type implied by the body, if it overrides the default
    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Json(_) => None,
            RequestBody::Raw { content_type, .. } => Some(content_type),
        }
    }

    /// Encode the body
    pub fn to_bytes(&self) -> Bytes {
        match self {
            RequestBody::Json(value) => Bytes::from(value.to_string()),
            RequestBody::Raw { bytes, .. } => bytes.clone(),
        }
    }
}

/// A fully resolved HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Endpoint URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Encoded body
    pub body: Bytes,
}

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse the body as JSON
    pub fn into_parsed(self) -> ParsedResponse {
        parse_response(self.status, self.status_text, self.headers, &self.body)
    }
}

/// Sends a single HTTP request
///
/// Timeouts, TLS and connection pooling are the transport's concern; the
/// pipeline never cancels or retries a send.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Send a request and return the raw response
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
