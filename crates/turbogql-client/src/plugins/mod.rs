//! Plugin system for the TurboGQL client
//!
//! Every operation runs through an ordered chain of plugins sharing one
//! [`OperationContext`]:
//!
//! ```text
//! execute → cache → dedup → fetch ──→ caller gets the first result
//!                               └──→ remaining plugins (background)
//!                                      └──→ after-query hooks
//! ```
//!
//! ## Core Components
//!
//! - **ClientPlugin**: trait every stage implements
//! - **PluginRegistry**: ordered plugin list and chain driver
//! - **OperationContext**: request metadata, result sink and hooks
//! - **Reference plugins**: CachePlugin, DedupPlugin, FetchPlugin,
//!   BatchPlugin, SubscriptionPlugin

pub mod batch;
pub mod cache;
pub mod context;
pub mod core;
pub mod dedup;
pub mod fetch;
pub mod registry;
pub mod subscriptions;

pub use self::core::{ClientPlugin, PluginError, PluginResult};
pub use batch::{BatchConfig, BatchPlugin};
pub use cache::{CacheEntry, CachePlugin, CacheStats};
pub use context::{AfterQueryHook, OperationContext, RequestOptions, ResultSink, ResultStream};
pub use dedup::DedupPlugin;
pub use fetch::FetchPlugin;
pub use registry::PluginRegistry;
pub use subscriptions::{SubscriptionForwarder, SubscriptionPlugin, SubscriptionRequest};
