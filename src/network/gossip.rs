// Gossip is how this node talks to everybody else: it keeps the peer registry,
// learns the network from the bootstrap node, and pushes blocks and
// transactions out. Sends are fire-and-forget tasks; a failed send is logged
// and dropped, never retried.

use crate::core::{Block, Broadcaster, Transaction};
use crate::network::message::{BlockEnvelope, TransactionEnvelope};
use crate::network::{Node, Nodes, PeerClient};
use crate::error::Result;
use log::{info, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

pub struct Gossip {
    me: Node,
    nodes: Nodes,
    client: PeerClient,
    bootstrap_address: String,
    is_bootstrap: bool,
    // caps how many outbound sends are in flight at once
    outbound: Arc<Semaphore>,
}

impl Gossip {
    pub fn new(
        me: Node,
        client: PeerClient,
        bootstrap_address: &str,
        is_bootstrap: bool,
        max_outbound_requests: usize,
    ) -> Result<Gossip> {
        let nodes = Nodes::new();
        nodes.add(me.clone())?;
        Ok(Gossip {
            me,
            nodes,
            client,
            bootstrap_address: bootstrap_address.to_string(),
            is_bootstrap,
            outbound: Arc::new(Semaphore::new(max_outbound_requests.max(1))),
        })
    }

    pub fn get_me(&self) -> &Node {
        &self.me
    }

    pub fn get_nodes(&self) -> &Nodes {
        &self.nodes
    }

    pub fn get_client(&self) -> &PeerClient {
        &self.client
    }

    pub fn is_bootstrap(&self) -> bool {
        self.is_bootstrap
    }

    /// Every known node except this one, in discovery order.
    pub fn peers(&self) -> Vec<Node> {
        let my_address = self.me.address();
        self.nodes
            .get_nodes()
            .into_iter()
            .filter(|node| node.address() != my_address)
            .collect()
    }

    // A joining node learns the member list from the bootstrap node. The
    // bootstrap node is the network, so it has nothing to learn.
    pub async fn sync_from_bootstrap(&self) -> bool {
        if self.is_bootstrap {
            return true;
        }

        let list = match self.client.nodes(&self.bootstrap_address).await {
            Ok(list) => list,
            Err(e) => {
                warn!(
                    "Could not fetch the node list from {}: {e}",
                    self.bootstrap_address
                );
                return false;
            }
        };

        let mut added = 0;
        for node in list.list {
            match self.nodes.add(node) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => warn!("Could not register a node from the bootstrap list: {e}"),
            }
        }
        info!(
            "Synced {added} of {} nodes from {}",
            list.length, self.bootstrap_address
        );
        true
    }

    pub fn announce_self_to_all(&self) {
        let me = self.me.clone();
        self.spawn_to_peers("registration", move |client, address| {
            let me = me.clone();
            async move { client.register(&address, &me).await }
        });
    }

    pub fn broadcast_block(&self, block: &Block) {
        let envelope = BlockEnvelope {
            block: block.clone(),
            sender: self.me.address(),
        };
        self.spawn_to_peers("block", move |client, address| {
            let envelope = envelope.clone();
            async move { client.send_block(&address, &envelope).await }
        });
    }

    pub fn broadcast_transaction(&self, tr: &Transaction) {
        let envelope = TransactionEnvelope {
            transaction: tr.clone(),
            sender: self.me.address(),
        };
        self.spawn_to_peers("transaction", move |client, address| {
            let envelope = envelope.clone();
            async move { client.send_transaction(&address, &envelope).await }
        });
    }

    fn spawn_to_peers<F, Fut>(&self, what: &'static str, send: F)
    where
        F: Fn(PeerClient, String) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, {what} not sent");
                return;
            }
        };

        for peer in self.peers() {
            let address = peer.address();
            let request = send(self.client.clone(), address.clone());
            let outbound = self.outbound.clone();
            handle.spawn(async move {
                let _permit = match outbound.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if let Err(e) = request.await {
                    warn!("Failed to send {what} to {address}: {e}");
                }
            });
        }
    }
}

impl Broadcaster for Gossip {
    fn broadcast_block(&self, block: &Block) {
        Gossip::broadcast_block(self, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::DEFAULT_PROTOCOL;
    use std::time::Duration;

    fn gossip_on(port: u16, is_bootstrap: bool) -> Gossip {
        let me = Node::new("localhost", DEFAULT_PROTOCOL, port, "me", "");
        let client = PeerClient::new(Duration::from_millis(200)).unwrap();
        Gossip::new(me, client, "http://localhost:1", is_bootstrap, 4).unwrap()
    }

    #[test]
    fn test_me_is_registered_first_and_not_a_peer() {
        let gossip = gossip_on(8100, true);
        assert_eq!(gossip.get_nodes().len(), 1);
        assert!(gossip.peers().is_empty());

        gossip
            .get_nodes()
            .add(Node::new("localhost", DEFAULT_PROTOCOL, 8101, "other", ""))
            .unwrap();
        let peers = gossip.peers();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].address(), "http://localhost:8101");
    }

    #[tokio::test]
    async fn test_bootstrap_sync_is_a_no_op() {
        assert!(gossip_on(8102, true).sync_from_bootstrap().await);
    }

    #[tokio::test]
    async fn test_unreachable_bootstrap_fails_sync() {
        let gossip = gossip_on(8103, false);
        assert!(!gossip.sync_from_bootstrap().await);
        assert_eq!(gossip.get_nodes().len(), 1);
    }

    #[test]
    fn test_broadcast_without_runtime_does_not_panic() {
        let gossip = gossip_on(8104, true);
        gossip
            .get_nodes()
            .add(Node::new("localhost", DEFAULT_PROTOCOL, 1, "gone", ""))
            .unwrap();
        let block = Block::new_block(1, vec![], 100, "0".repeat(64)).unwrap();
        Broadcaster::broadcast_block(&gossip, &block);
    }
}
