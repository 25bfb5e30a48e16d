//! Operation identity
//!
//! Keys are a djb2 hash of the canonical query text followed by a
//! key-order-independent serialization of the variables. Two operations with
//! colliding hashes are treated as the same operation by the cache and the
//! deduplicator.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Stable 32-bit identity of a query + variables pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(u32);

impl OperationKey {
    /// Compute the key of an operation
    ///
    /// Blank queries hash their raw text; such operations are rejected by
    /// the client before any plugin sees them.
    pub fn of(operation: &Operation) -> Self {
        let query = operation.normalized_query().unwrap_or(&operation.query);
        Self::compute(query, operation.variables.as_ref())
    }

    /// Compute the key from canonical query text and variables
    pub fn compute(query: &str, variables: Option<&Value>) -> Self {
        let mut input = String::with_capacity(query.len() + 32);
        input.push_str(query);
        if let Some(variables) = variables.filter(|v| !v.is_null()) {
            input.push_str(&stable_stringify(variables));
        }
        Self(djb2(&input))
    }

    /// Raw hash value
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for OperationKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Walks UTF-16 code units, not UTF-8 bytes.
fn djb2(input: &str) -> u32 {
    input.encode_utf16().fold(5381u32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(u32::from(unit))
    })
}

/// Serialize a JSON value with object keys sorted at every depth
///
/// Output has no insignificant whitespace, so structurally equal values
/// always produce the same string regardless of key insertion order.
pub fn stable_stringify(value: &Value) -> String {
    let mut out = String::new();
    write_stable(value, &mut out);
    out
}

fn write_stable(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_stable(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_stable(&map[key], out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
