// Canonical byte encoding used for content hashing and the wire format.
// Field order follows the struct definitions, so the same value always
// produces the same bytes.
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Serialize data to canonical JSON bytes
pub fn serialize<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(data)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data from JSON bytes
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(bytes)
        .map_err(|e| BlockchainError::InvalidFormat(format!("Deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        id: u64,
        name: String,
        values: Vec<i32>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestData {
            id: 42,
            name: "test".to_string(),
            values: vec![1, 2, 3, 4, 5],
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: TestData = deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_serialization_is_stable() {
        let data = TestData {
            id: 7,
            name: "stable".to_string(),
            values: vec![],
        };
        assert_eq!(serialize(&data).unwrap(), serialize(&data.clone()).unwrap());
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<TestData> = deserialize(&invalid_bytes);
        assert!(matches!(result, Err(BlockchainError::InvalidFormat(_))));
    }
}
