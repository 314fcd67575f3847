// Longest-valid-chain resolution. I ask a handful of peers how long their
// chain is, then try the longest ones until one validates.

use crate::core::Blockchain;
use crate::network::{Gossip, Node};
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

pub const DEFAULT_MAX_STATUS_POLLS: usize = 10;
// Only the first few poll failures are kept for the log
const ERROR_QUEUE_CAPACITY: usize = 4;

struct PeerStatus {
    order: usize,
    address: String,
    length: usize,
}

pub struct Resolver {
    gossip: Arc<Gossip>,
    max_polls: usize,
}

impl Resolver {
    pub fn new(gossip: Arc<Gossip>, max_polls: usize) -> Resolver {
        Resolver { gossip, max_polls }
    }

    async fn poll_statuses(&self, peers: Vec<Node>) -> Vec<PeerStatus> {
        let (result_tx, mut result_rx) = mpsc::channel(peers.len().max(1));
        let (error_tx, mut error_rx) = mpsc::channel(ERROR_QUEUE_CAPACITY);

        let mut polls = JoinSet::new();
        for (order, peer) in peers.into_iter().enumerate() {
            let client = self.gossip.get_client().clone();
            let result_tx = result_tx.clone();
            let error_tx = error_tx.clone();
            polls.spawn(async move {
                let address = peer.address();
                match client.status(&address).await {
                    Ok(status) => {
                        let _ = result_tx
                            .send(PeerStatus {
                                order,
                                address,
                                length: status.length,
                            })
                            .await;
                    }
                    Err(e) => {
                        // the queue is full once enough failures are captured
                        let _ = error_tx.try_send(format!("{address}: {e}"));
                    }
                }
            });
        }
        drop(result_tx);
        drop(error_tx);

        while let Some(joined) = polls.join_next().await {
            if let Err(e) = joined {
                warn!("Status poll task failed: {e}");
            }
        }
        while let Ok(error) = error_rx.try_recv() {
            warn!("Status poll failed for {error}");
        }

        let mut statuses = Vec::new();
        while let Ok(status) = result_rx.try_recv() {
            statuses.push(status);
        }
        statuses
    }

    /// Replaces the local chain with the longest valid chain among the polled
    /// peers. Returns whether a replacement happened.
    pub async fn resolve(&self, blockchain: &Blockchain) -> bool {
        let peers: Vec<Node> = self
            .gossip
            .peers()
            .into_iter()
            .take(self.max_polls)
            .collect();
        if peers.is_empty() {
            info!("No peers to resolve against");
            return false;
        }

        let mut ranked = self.poll_statuses(peers).await;
        ranked.sort_by_key(|status| (Reverse(status.length), status.order));

        let local_length = blockchain.len();
        for status in ranked {
            if status.length <= local_length {
                break;
            }
            let response = match self.gossip.get_client().chain(&status.address).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Could not fetch the chain of {}: {e}", status.address);
                    continue;
                }
            };
            if blockchain.adopt_chain(response.chain) {
                info!("Adopted the chain of {}", status.address);
                return true;
            }
            warn!("Rejected an invalid chain from {}", status.address);
        }
        false
    }

    // A joining node also picks up what the network has not confirmed yet
    pub async fn adopt_pending_transactions(&self, blockchain: &Blockchain) -> usize {
        for peer in self.gossip.peers() {
            let address = peer.address();
            let transactions = match self.gossip.get_client().pending_transactions(&address).await {
                Ok(transactions) => transactions,
                Err(e) => {
                    warn!("Could not fetch pending transactions from {address}: {e}");
                    continue;
                }
            };

            let mut adopted = 0;
            for tr in transactions {
                match blockchain.admit(tr) {
                    Ok(_) => adopted += 1,
                    Err(e) => debug!("Skipped a pending transaction from {address}: {e}"),
                }
            }
            return adopted;
        }
        0
    }
}
