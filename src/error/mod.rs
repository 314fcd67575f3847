//! Error handling for the ledger node
//!
//! Every failure the node can report, locally or to an HTTP caller, is one of
//! these variants. Peer communication failures are always `PeerUnreachable` and
//! are logged and skipped by gossip and resolution rather than surfaced.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error taxonomy for the node
#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Malformed JSON, hash or amount
    InvalidFormat(String),
    /// Sender is neither a well-formed wallet hash nor the coinbase sentinel
    InvalidSender(String),
    /// Recipient is not a well-formed wallet hash
    InvalidRecipient(String),
    /// Derived balance of the sender does not cover the amount
    InsufficientBalance { required: f64, available: f64 },
    /// A transaction with the same identity hash is already pooled
    DuplicateTransaction(String),
    /// Block rejected by local validation
    InvalidProof { index: u64, reason: String },
    /// A gap in the chain could not be reconstructed from the announcing peer
    BackfillFailed(String),
    /// The operation needs a last block but the chain is empty
    EmptyChain,
    /// A requested block does not exist
    NotFound(String),
    /// Network or decode failure talking to a peer
    PeerUnreachable(String),
    /// Proof search was cancelled or its worker failed
    Mining(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    /// HTTP status used when the error is returned to a caller.
    pub fn status_code(&self) -> u16 {
        match self {
            BlockchainError::InvalidFormat(_) => 400,
            BlockchainError::InvalidSender(_)
            | BlockchainError::InvalidRecipient(_)
            | BlockchainError::InsufficientBalance { .. }
            | BlockchainError::DuplicateTransaction(_) => 422,
            BlockchainError::InvalidProof { .. }
            | BlockchainError::BackfillFailed(_)
            | BlockchainError::EmptyChain => 409,
            BlockchainError::NotFound(_) => 404,
            BlockchainError::PeerUnreachable(_) => 502,
            BlockchainError::Mining(_)
            | BlockchainError::Config(_)
            | BlockchainError::Serialization(_)
            | BlockchainError::Io(_) => 500,
        }
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            BlockchainError::InvalidSender(sender) => {
                write!(f, "Invalid transaction (sender invalid): {sender}")
            }
            BlockchainError::InvalidRecipient(recipient) => {
                write!(f, "Invalid transaction (recipient invalid): {recipient}")
            }
            BlockchainError::InsufficientBalance {
                required,
                available,
            } => {
                write!(
                    f,
                    "Invalid transaction (insufficient credit): required {required}, available {available}"
                )
            }
            BlockchainError::DuplicateTransaction(hash) => {
                write!(f, "Invalid transaction (already exists): {hash}")
            }
            BlockchainError::InvalidProof { index, reason } => {
                write!(f, "Invalid block {index}: {reason}")
            }
            BlockchainError::BackfillFailed(msg) => write!(f, "Backfill failed: {msg}"),
            BlockchainError::EmptyChain => write!(f, "The chain is empty"),
            BlockchainError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BlockchainError::PeerUnreachable(msg) => write!(f, "Peer unreachable: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for BlockchainError {
    fn from(err: reqwest::Error) -> Self {
        BlockchainError::PeerUnreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_client_statuses() {
        assert_eq!(BlockchainError::InvalidFormat("x".into()).status_code(), 400);
        assert_eq!(
            BlockchainError::InsufficientBalance {
                required: 1.0,
                available: 0.0
            }
            .status_code(),
            422
        );
        assert_eq!(
            BlockchainError::InvalidProof {
                index: 2,
                reason: "bad".into()
            }
            .status_code(),
            409
        );
        assert_eq!(BlockchainError::NotFound("7".into()).status_code(), 404);
    }

    #[test]
    fn test_display_carries_reason() {
        let err = BlockchainError::InvalidSender("abc".to_string());
        assert_eq!(err.to_string(), "Invalid transaction (sender invalid): abc");
    }
}
