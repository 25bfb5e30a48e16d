//! Prelude module for convenient imports
//!
//! ```rust,no_run
//! use turbogql_client::prelude::*;
//!
//! # async fn example() -> Result<(), ClientError> {
//! let client = Client::new("https://api.example.com/graphql")?;
//! let result = client.execute(Operation::query("{ viewer { id } }")).await?;
//! # Ok(())
//! # }
//! ```

pub use crate::{CRATE_NAME, VERSION};

pub use crate::{
    CachePolicy, Client, ClientBuilder, ClientConfig, ClientError, CombinedError, GraphQLError,
    Operation, OperationResult, OperationType,
};

pub use crate::plugins::{
    BatchConfig, BatchPlugin, CachePlugin, ClientPlugin, DedupPlugin, FetchPlugin,
    OperationContext, PluginError, PluginResult, SubscriptionForwarder, SubscriptionPlugin,
};

pub use crate::transport::{HttpTransport, ReqwestTransport};
