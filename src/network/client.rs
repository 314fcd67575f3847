use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::message::{
    BlockEnvelope, ChainResponse, NodeList, StatusResponse, TransactionEnvelope,
};
use crate::network::Node;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for talking to other nodes. Every request carries the same
/// timeout, so an unresponsive peer can never stall the caller for longer.
#[derive(Clone)]
pub struct PeerClient {
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<PeerClient> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlockchainError::Config(format!("building the HTTP client: {e}")))?;
        Ok(PeerClient { http })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!("GET {url}");
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BlockchainError::PeerUnreachable(format!("{url} sent bad JSON: {e}")))
    }

    async fn post_json<B: Serialize>(&self, url: String, body: &B) -> Result<()> {
        debug!("POST {url}");
        self.http
            .post(&url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn status(&self, peer: &str) -> Result<StatusResponse> {
        self.get_json(format!("{peer}/status")).await
    }

    pub async fn chain(&self, peer: &str) -> Result<ChainResponse> {
        self.get_json(format!("{peer}/chain")).await
    }

    pub async fn block_by_index(&self, peer: &str, index: u64) -> Result<Block> {
        self.get_json(format!("{peer}/block/index/{index}")).await
    }

    pub async fn nodes(&self, peer: &str) -> Result<NodeList> {
        self.get_json(format!("{peer}/node")).await
    }

    pub async fn pending_transactions(&self, peer: &str) -> Result<Vec<Transaction>> {
        self.get_json(format!("{peer}/transactions")).await
    }

    pub async fn register(&self, peer: &str, me: &Node) -> Result<()> {
        self.post_json(format!("{peer}/node"), me).await
    }

    pub async fn send_block(&self, peer: &str, envelope: &BlockEnvelope) -> Result<()> {
        self.post_json(format!("{peer}/block/distributed"), envelope)
            .await
    }

    pub async fn send_transaction(&self, peer: &str, envelope: &TransactionEnvelope) -> Result<()> {
        self.post_json(format!("{peer}/transaction/distributed"), envelope)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_peer_is_an_error() {
        let client = PeerClient::new(Duration::from_millis(500)).unwrap();
        // port 9 (discard) on localhost is not served by anything here
        let result = client.status("http://127.0.0.1:9").await;
        assert!(matches!(result, Err(BlockchainError::PeerUnreachable(_))));
    }
}
