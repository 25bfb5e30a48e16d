//! Operation result envelope

use crate::error::CombinedError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Normalized outcome of an operation
///
/// Usually exactly one of `data` and `error` is set. Both are set for partial
/// results (data returned alongside GraphQL errors), and neither is set for a
/// `cache-only` miss.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationResult {
    /// Response `data` member
    pub data: Option<Value>,
    /// Network or GraphQL error
    pub error: Option<CombinedError>,
}

impl OperationResult {
    /// Create a result from its parts
    pub fn new(data: Option<Value>, error: Option<CombinedError>) -> Self {
        Self { data, error }
    }

    /// A successful result
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// A failed result with no data
    pub fn from_error(error: CombinedError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// The empty result produced by a `cache-only` miss
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when neither data nor error is present
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    /// True when there is no error at all
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Deserialize `data` into a typed value
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when `data` does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data
            .as_ref()
            .map(|data| serde_json::from_value(data.clone()))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Posts {
        posts: Vec<Post>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        id: u32,
    }

    #[test]
    fn test_decode_typed_data() {
        let result = OperationResult::from_data(json!({"posts": [{"id": 1}, {"id": 2}]}));
        let posts: Posts = result.decode().unwrap().unwrap();
        assert_eq!(posts.posts, vec![Post { id: 1 }, Post { id: 2 }]);
    }

    #[test]
    fn test_decode_without_data() {
        let result = OperationResult::from_error(CombinedError::network("down", None));
        assert_eq!(result.decode::<Posts>().unwrap(), None);
        assert!(!result.is_ok());
    }

    #[test]
    fn test_empty_result() {
        let result = OperationResult::empty();
        assert!(result.is_empty());
        assert!(result.is_ok());
    }
}
