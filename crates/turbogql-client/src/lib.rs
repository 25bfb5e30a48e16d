//! # `TurboGQL` Client
//!
//! GraphQL client built around an ordered, pluggable execution pipeline.
//!
//! ## Features
//!
//! - Result caching with four cache policies and tag-based invalidation
//! - Deduplication of concurrent identical queries
//! - Request batching with a debounce window and size cap
//! - HTTP fetch over any [`HttpTransport`](transport::HttpTransport)
//!   (reqwest by default)
//! - Subscription pass-through to an injected stream forwarder
//! - Custom plugins that mutate requests, short-circuit, or observe results
//!
//! ## Architecture
//!
//! ```text
//! Client::execute
//!        ↓
//! OperationContext (key, cache policy, request metadata)
//!        ↓
//! cache → dedup → fetch | batch      (stop at first result)
//!        ↓
//! caller receives the result
//!        ↓
//! remaining plugins, then after-query hooks (background)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use turbogql_client::{CachePolicy, Client, Operation};
//!
//! # async fn example() -> Result<(), turbogql_client::ClientError> {
//! let client = Client::builder()
//!     .with_url("https://api.example.com/graphql")
//!     .with_cache_policy(CachePolicy::CacheFirst)
//!     .build()?;
//!
//! let posts = client
//!     .execute(Operation::query("{ posts { id title } }").with_tags(["posts"]))
//!     .await?;
//! println!("{:?}", posts.data);
//!
//! // A successful mutation evicts everything tagged "posts"
//! client
//!     .execute(Operation::mutation("mutation { addPost(title: \"hi\") { id } }")
//!         .with_clear_cache_tags(["posts"]))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod plugins;
pub mod prelude;
pub mod transport;

pub use client::{Client, ClientBuilder, ClientConfig, ResultUpdates};
pub use error::ClientError;

pub use turbogql_protocol::{
    CachePolicy, CombinedError, GraphQLError, NetworkError, Operation, OperationKey,
    OperationResult, OperationType, ParsedResponse,
};

/// Crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
