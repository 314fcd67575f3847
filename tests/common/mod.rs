//! Shared setup for tests that run real nodes over HTTP

#![allow(dead_code)]

use peer_chain::config::Config;
use peer_chain::network::NodeState;
use peer_chain::{Block, Server};
use std::net::TcpListener;
use std::time::Duration;

pub const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// A port nothing is listening on right now
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Config for a node on `port` that joins through `bootstrap_port`.
/// A node whose port equals the bootstrap port starts the network.
pub fn node_config(port: u16, bootstrap_port: u16) -> Config {
    let mut config = Config::default();
    config.node.hostname = "127.0.0.1".to_string();
    config.node.port = port;
    config.node.name = format!("node-{port}");
    config.network.bootstrap_host = "127.0.0.1".to_string();
    config.network.bootstrap_port = bootstrap_port;
    config.network.peer_timeout_ms = 2000;
    config.mining.difficulty = 1;
    config
}

/// Boots a node and serves it in the background until the test ends
pub async fn start_node(config: Config) -> NodeState {
    let server = Server::bootstrap(config).await.unwrap();
    let state = server.get_state().clone();
    let (_, serving) = server.bind(std::future::pending::<()>()).unwrap();
    tokio::spawn(serving);
    state
}

pub async fn start_bootstrap() -> NodeState {
    let port = free_port();
    start_node(node_config(port, port)).await
}

pub fn address_of(state: &NodeState) -> String {
    state.gossip.get_me().address()
}

pub async fn mine(client: &reqwest::Client, address: &str) -> Block {
    let response = client.get(format!("{address}/mine")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

/// Polls `check` until it holds, failing the test after a few seconds
pub async fn wait_until<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {what}");
}
