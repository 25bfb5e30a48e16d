//! Response parsing and classification
//!
//! [`parse_response`] turns raw HTTP response parts into a [`ParsedResponse`].
//! [`classify`] maps a parsed single-operation response to an
//! [`OperationResult`]; the fetch and batch plugins both go through it.

use crate::error::{CombinedError, GraphQLError};
use crate::result::OperationResult;
use serde_json::Value;
use std::collections::HashMap;

/// HTTP response metadata with the parsed JSON body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedResponse {
    /// Whether the status is 2xx
    pub ok: bool,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase, or the parse failure message when the body is not JSON
    pub status_text: String,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Parsed body; `None` when the body was empty or malformed
    pub body: Option<Value>,
}

impl ParsedResponse {
    /// Copy of this response with a different body
    ///
    /// Used to hand each batched operation its own slice of the array body.
    pub fn with_body(&self, body: Option<Value>) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }
}

/// Parse raw response parts
///
/// A body that is not valid JSON yields `body = None` and carries the parse
/// error message as `status_text`.
pub fn parse_response(
    status: u16,
    status_text: impl Into<String>,
    headers: HashMap<String, String>,
    bytes: &[u8],
) -> ParsedResponse {
    let ok = (200..300).contains(&status);
    let headers = headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();

    match serde_json::from_slice::<Value>(bytes) {
        Ok(body) => ParsedResponse {
            ok,
            status,
            status_text: status_text.into(),
            headers,
            body: Some(body),
        },
        Err(e) => ParsedResponse {
            ok,
            status,
            status_text: e.to_string(),
            headers,
            body: None,
        },
    }
}

/// Map a parsed response to an operation result
///
/// - non-2xx, missing or `null` body: GraphQL error when the body still carries an
///   `errors` array, network error with the status text otherwise
/// - `errors` present: GraphQL error alongside whatever `data` came back
/// - otherwise: plain data
pub fn classify(response: &ParsedResponse) -> OperationResult {
    let data = response
        .body
        .as_ref()
        .and_then(|body| body.get("data"))
        .filter(|data| !data.is_null())
        .cloned();
    let graphql_errors = response
        .body
        .as_ref()
        .and_then(GraphQLError::list_from_body);

    let empty = response.body.as_ref().is_none_or(Value::is_null);
    if !response.ok || empty {
        let error = match graphql_errors {
            Some(errors) => CombinedError::graphql(errors, Some(response.clone())),
            None => CombinedError::network(response.status_text.clone(), Some(response.clone())),
        };
        return OperationResult::new(data, Some(error));
    }

    let Some(errors) = graphql_errors else {
        return OperationResult::new(data, None);
    };
    let error = CombinedError::graphql(errors, Some(response.clone()));
    OperationResult::new(data, Some(error))
}
