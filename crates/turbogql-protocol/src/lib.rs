//! # TurboGQL Protocol
//!
//! Wire-level data model shared by the TurboGQL client and its plugins.
//!
//! ## Contents
//!
//! - [`Operation`]: query/mutation/subscription description submitted to a client
//! - [`OperationKey`]: stable 32-bit identity of a query + variables pair
//! - [`OperationResult`]: the normalized `{ data, error }` envelope
//! - [`CombinedError`]: network failure or GraphQL error list, plus the raw response
//! - [`ParsedResponse`]: HTTP response metadata with the parsed JSON body
//!
//! Nothing in this crate performs I/O. Queries are opaque strings; the only
//! transformation applied to them is [`normalize_query`].
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use turbogql_protocol::{Operation, OperationKey};
//!
//! let a = Operation::query("{ posts(first: $n) { id } }").with_variables(json!({"n": 5, "m": 1}));
//! let b = Operation::query("{ posts(first: $n) { id } }").with_variables(json!({"m": 1, "n": 5}));
//!
//! // Variable order does not affect identity
//! assert_eq!(OperationKey::of(&a), OperationKey::of(&b));
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod error;
pub mod key;
pub mod operation;
pub mod response;
pub mod result;

pub use error::{CombinedError, GraphQLError, Location, NetworkError};
pub use key::{OperationKey, stable_stringify};
pub use operation::{CachePolicy, Operation, OperationType, normalize_query};
pub use response::{ParsedResponse, classify, parse_response};
pub use result::OperationResult;
