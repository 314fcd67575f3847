//! Peer-to-peer networking over HTTP
//!
//! This module handles the peer registry, gossip of blocks and transactions,
//! the client used to talk to other nodes, and the node's own HTTP surface.

pub mod client;
pub mod gossip;
pub mod message;
pub mod node;
pub mod server;

pub use client::PeerClient;
pub use gossip::Gossip;
pub use node::{Node, Nodes};
pub use server::{routes, NodeState, Server};
