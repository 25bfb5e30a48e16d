//! Error types carried inside operation results
//!
//! None of these are returned as `Err` by the client. Transport failures and
//! server-reported GraphQL errors are part of a normal [`OperationResult`],
//! and the caller decides what to do with them.
//!
//! [`OperationResult`]: crate::OperationResult

use crate::response::ParsedResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Source position of a GraphQL error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// A structured error reported by a GraphQL server
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct GraphQLError {
    /// Human readable message
    pub message: String,

    /// Locations in the document the error refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,

    /// Response path of the failing field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,

    /// Server-specific extensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    /// Read the `errors` member of a response body
    ///
    /// Entries that are not well-formed error objects are kept, using their
    /// JSON text as the message. Returns `None` when there is no `errors`
    /// array.
    pub fn list_from_body(body: &Value) -> Option<Vec<GraphQLError>> {
        let errors = body.get("errors")?.as_array()?;
        Some(
            errors
                .iter()
                .map(|entry| {
                    serde_json::from_value(entry.clone())
                        .unwrap_or_else(|_| GraphQLError::new(entry.to_string()))
                })
                .collect(),
        )
    }
}

/// A transport or parse level failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NetworkError {
    /// Failure description
    pub message: String,
}

impl NetworkError {
    /// Create a network error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Network error or GraphQL errors, together with the response that caused them
///
/// A combined error without either kind is degenerate input; it is still a
/// valid value with an empty message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CombinedError {
    message: String,

    /// Transport or parse failure
    pub network_error: Option<NetworkError>,

    /// Server-reported errors
    pub graphql_errors: Vec<GraphQLError>,

    /// Response the error was derived from, when one was received
    pub response: Option<ParsedResponse>,
}

impl CombinedError {
    /// Build a combined error from its parts
    pub fn new(
        network_error: Option<NetworkError>,
        graphql_errors: Vec<GraphQLError>,
        response: Option<ParsedResponse>,
    ) -> Self {
        let message = match &network_error {
            Some(network) => format!("[Network] {}", network.message),
            None => graphql_errors
                .iter()
                .map(|e| format!("[GraphQL] {}", e.message))
                .collect::<Vec<_>>()
                .join("\n"),
        };

        Self {
            message,
            network_error,
            graphql_errors,
            response,
        }
    }

    /// A network error
    pub fn network(message: impl Into<String>, response: Option<ParsedResponse>) -> Self {
        Self::new(Some(NetworkError::new(message)), Vec::new(), response)
    }

    /// GraphQL errors returned with a response
    pub fn graphql(errors: Vec<GraphQLError>, response: Option<ParsedResponse>) -> Self {
        Self::new(None, errors, response)
    }

    /// Formatted message, one line per underlying error
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this is a transport or parse failure
    pub fn is_network_error(&self) -> bool {
        self.network_error.is_some()
    }

    /// Whether the server reported GraphQL errors
    pub fn is_graphql_error(&self) -> bool {
        !self.graphql_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_network_message() {
        let error = CombinedError::network("connection refused", None);
        assert_eq!(error.to_string(), "[Network] connection refused");
        assert!(error.is_network_error());
        assert!(!error.is_graphql_error());
    }

    #[test]
    fn test_graphql_message_lists_every_error() {
        let error = CombinedError::graphql(
            vec![GraphQLError::new("first"), GraphQLError::new("second")],
            None,
        );
        assert_eq!(error.message(), "[GraphQL] first\n[GraphQL] second");
        assert!(error.is_graphql_error());
    }

    #[test]
    fn test_degenerate_error_has_empty_message() {
        let error = CombinedError::new(None, Vec::new(), None);
        assert_eq!(error.message(), "");
        assert!(!error.is_network_error());
        assert!(!error.is_graphql_error());
    }

    #[test]
    fn test_list_from_body() {
        let body = json!({
            "data": null,
            "errors": [
                {"message": "boom", "locations": [{"line": 1, "column": 3}], "path": ["posts", 0]},
                "not an object"
            ]
        });

        let errors = GraphQLError::list_from_body(&body).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "boom");
        assert_eq!(
            errors[0].locations,
            Some(vec![Location { line: 1, column: 3 }])
        );
        assert_eq!(errors[1].message, "\"not an object\"");

        assert!(GraphQLError::list_from_body(&json!({"data": {}})).is_none());
    }
}
