//! Core plugin system traits and types
//!
//! Defines the [`ClientPlugin`] trait every pipeline stage implements and the
//! error type plugins report failures with.

use super::context::OperationContext;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that can occur while a plugin handles an operation
///
/// Network and GraphQL failures are not plugin errors: they are delivered as
/// part of the operation result. A `PluginError` means the plugin itself
/// could not do its job.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PluginError {
    /// Plugin configuration is invalid for this operation
    #[error("Invalid plugin configuration: {message}")]
    Configuration { message: String },

    /// Error while processing the operation
    #[error("Operation processing error: {message}")]
    Processing { message: String },

    /// External system error
    #[error("External system error: {source}")]
    External {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PluginError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a processing error
    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }
}

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

// ============================================================================
// CLIENT PLUGIN TRAIT
// ============================================================================

/// A stage of the operation pipeline
///
/// Plugins run in registration order, each receiving the shared
/// [`OperationContext`]. A plugin may:
///
/// - mutate the outgoing request (URL, headers, body)
/// - produce the result with [`OperationContext::use_result`], optionally
///   terminating the chain
/// - register after-query hooks that observe the final result
///
/// The client stops its foreground pass the moment any plugin produces a
/// result. When that plugin did not terminate, the remaining plugins still
/// run in the background and may replace the result before the hooks see it.
///
/// # Examples
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use turbogql_client::plugins::{ClientPlugin, OperationContext, PluginResult};
///
/// #[derive(Debug)]
/// struct AuthPlugin {
///     token: String,
/// }
///
/// #[async_trait]
/// impl ClientPlugin for AuthPlugin {
///     fn name(&self) -> &str {
///         "auth"
///     }
///
///     async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()> {
///         context
///             .request
///             .headers
///             .insert("authorization".to_string(), format!("Bearer {}", self.token));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ClientPlugin: Send + Sync + fmt::Debug {
    /// Plugin name - must be unique within a client
    fn name(&self) -> &str;

    /// Optional plugin description
    fn description(&self) -> Option<&str> {
        None
    }

    /// Handle one operation
    ///
    /// # Errors
    ///
    /// Returning an error aborts the foreground pass and surfaces to the
    /// caller as [`ClientError::Plugin`](crate::ClientError::Plugin). In the
    /// background pass the error is logged and dropped.
    async fn on_operation(&self, context: &mut OperationContext) -> PluginResult<()>;
}
