//! JSON bodies exchanged between nodes and returned to clients.

use crate::core::{Block, Transaction};
use crate::network::Node;
use serde::{Deserialize, Serialize};

/// A block announced by the node at `sender`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEnvelope {
    pub block: Block,
    pub sender: String,
}

/// A transaction relayed by the node at `sender`, time already stamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub transaction: Transaction,
    pub sender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub transactions: Vec<Transaction>,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub length: usize,
    // absent while the chain is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeList {
    pub list: Vec<Node>,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAdded {
    pub node: Node,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockResponse {
    pub success: bool,
    pub block: Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    pub success: bool,
    pub credit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
