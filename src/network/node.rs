use crate::core::identity::{is_well_formed_hash, ContentHash};
use crate::error::Result;
use crate::wallet::Wallet;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_PROTOCOL: &str = "http://";

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

// A participant in the network. Two nodes are the same peer when they
// share an address, whatever their name or wallet hash says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    hostname: String,
    #[serde(default = "default_protocol")]
    protocol: String,
    port: u16,
    #[serde(default)]
    name: String,
    #[serde(default)]
    hash: String,
}

impl Node {
    pub fn new(hostname: &str, protocol: &str, port: u16, name: &str, hash: &str) -> Node {
        Node {
            hostname: hostname.to_string(),
            protocol: protocol.to_string(),
            port,
            name: name.to_string(),
            hash: hash.to_string(),
        }
    }

    /// protocol + hostname + ":" + port, e.g. `http://localhost:8000`
    pub fn address(&self) -> String {
        format!("{}{}:{}", self.protocol, self.hostname, self.port)
    }

    pub fn get_hostname(&self) -> &str {
        self.hostname.as_str()
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }
}

impl ContentHash for Node {
    fn content_hash(&self) -> String {
        self.hash.clone()
    }
}

/// Every node this node knows about, itself included, in discovery order.
pub struct Nodes {
    inner: RwLock<Vec<Node>>,
}

impl Default for Nodes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nodes {
    pub fn new() -> Nodes {
        Nodes {
            inner: RwLock::new(vec![]),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Node>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Node>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Returns false when the address is already registered. A node that
    // arrives without a usable wallet hash gets a fresh one.
    pub fn add(&self, mut node: Node) -> Result<bool> {
        if self.node_is_known(&node.address()) {
            return Ok(false);
        }
        if !is_well_formed_hash(&node.hash) {
            node.hash = Wallet::new()?.get_hash().to_string();
        }

        let mut inner = self.write();
        // checked again under the write lock, two registrations may race
        if inner.iter().any(|x| x.address() == node.address()) {
            return Ok(false);
        }
        info!("Registered node {} ({})", node.address(), node.name);
        inner.push(node);
        Ok(true)
    }

    pub fn get(&self, address: &str) -> Option<Node> {
        self.read().iter().find(|x| x.address() == address).cloned()
    }

    pub fn get_nodes(&self) -> Vec<Node> {
        self.read().to_vec()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn node_is_known(&self, address: &str) -> bool {
        self.read().iter().any(|x| x.address() == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::hashes_equal;

    const HASH: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn test_address_format() {
        let node = Node::new("localhost", DEFAULT_PROTOCOL, 8001, "a", HASH);
        assert_eq!(node.address(), "http://localhost:8001");
        assert_eq!(node.get_hostname(), "localhost");
        assert_eq!(node.get_port(), 8001);
    }

    #[test]
    fn test_add_is_idempotent_by_address() {
        let nodes = Nodes::new();
        assert!(nodes.add(Node::new("localhost", DEFAULT_PROTOCOL, 8001, "a", HASH)).unwrap());
        assert!(!nodes.add(Node::new("localhost", DEFAULT_PROTOCOL, 8001, "b", "")).unwrap());
        assert!(nodes.add(Node::new("localhost", DEFAULT_PROTOCOL, 8002, "c", HASH)).unwrap());

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes.get_nodes()[0].get_name(), "a");
        assert!(nodes.node_is_known("http://localhost:8002"));
    }

    #[test]
    fn test_malformed_hash_is_replaced() {
        let nodes = Nodes::new();
        nodes
            .add(Node::new("localhost", DEFAULT_PROTOCOL, 8003, "d", "not-a-hash"))
            .unwrap();

        let stored = nodes.get("http://localhost:8003").unwrap();
        assert!(is_well_formed_hash(stored.get_hash()));
    }

    #[test]
    fn test_node_json_defaults() {
        let json = r#"{"hostname":"127.0.0.1","port":8004}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.address(), "http://127.0.0.1:8004");
        assert_eq!(node.get_hash(), "");

        let twin = Node::new("elsewhere", DEFAULT_PROTOCOL, 1, "", "");
        assert!(hashes_equal(&node, &twin));
    }
}
