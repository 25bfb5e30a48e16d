//! Client core implementation
//!
//! - `core`: `Client` and the execution pipeline
//! - `builder`: `ClientBuilder` for construction
//! - `config`: request defaults

pub mod builder;
pub mod config;
pub mod core;

pub use self::core::{Client, ResultUpdates};
pub use builder::ClientBuilder;
pub use config::ClientConfig;
