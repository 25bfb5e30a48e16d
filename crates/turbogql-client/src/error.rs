//! Caller-visible client errors
//!
//! These are returned as `Err` from the client and are never retried.
//! Network and GraphQL failures are not among them; they arrive inside an
//! [`OperationResult`](turbogql_protocol::OperationResult).

use crate::plugins::PluginError;
use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// No plugin produced a result for the operation
    #[error("No plugin produced a result for the operation")]
    NoResult,

    /// The operation has no query text
    #[error("A query must be provided")]
    MissingQuery,

    /// The client configuration is invalid
    #[error("Invalid client configuration: {message}")]
    Configuration { message: String },

    /// A plugin failed before a result was produced
    #[error("Plugin '{plugin}' failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// The operation produced a stream; use `Client::subscribe`
    #[error("Operation produced a subscription stream, use subscribe()")]
    UnexpectedStream,

    /// `subscribe` was called with a query or mutation
    #[error("Only subscription operations can be subscribed to")]
    NotSubscription,
}

impl ClientError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a plugin failure
    pub fn plugin(plugin: impl Into<String>, source: PluginError) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ClientError::NoResult.to_string(),
            "No plugin produced a result for the operation"
        );
        let err = ClientError::plugin("batch", PluginError::processing("dropped"));
        assert_eq!(
            err.to_string(),
            "Plugin 'batch' failed: Operation processing error: dropped"
        );
    }
}
