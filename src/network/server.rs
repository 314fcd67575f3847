use crate::config::Config;
use crate::core::identity::is_well_formed_hash;
use crate::core::{Blockchain, BlockchainOptions, Resolver, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::message::{
    BlockEnvelope, BlockResponse, ChainResponse, CreditResponse, ErrorResponse, HistoryResponse,
    NodeAdded, NodeList, StatusResponse, TransactionEnvelope, ValidateResponse,
};
use crate::network::{Gossip, Node, PeerClient};
use crate::utils::deserialize;
use crate::wallet::Wallet;
use bytes::Bytes;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct NodeState {
    pub blockchain: Blockchain,
    pub gossip: Arc<Gossip>,
    pub resolver: Arc<Resolver>,
}

fn with_state(state: NodeState) -> impl Filter<Extract = (NodeState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

// Bodies are read as raw bytes and decoded by hand so bad JSON is a 400
fn body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes())
}

fn json_reply<T: Serialize>(value: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(value), status).into_response()
}

fn ok<T: Serialize>(value: &T) -> Response {
    json_reply(value, StatusCode::OK)
}

fn text(message: impl Into<String>) -> Response {
    let message: String = message.into();
    message.into_response()
}

fn error_reply(e: &BlockchainError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_reply(&ErrorResponse { error: e.to_string() }, status)
}

fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_reply(&e),
    }
}

fn check_hash(hash: &str) -> Result<()> {
    if is_well_formed_hash(hash) {
        Ok(())
    } else {
        Err(BlockchainError::InvalidFormat(format!(
            "{hash} is not a wallet hash"
        )))
    }
}

async fn register_node(body: Bytes, state: NodeState) -> Response {
    let node: Node = match deserialize(&body) {
        Ok(node) => node,
        Err(e) => return error_reply(&e),
    };
    let address = node.address();
    let nodes = state.gossip.get_nodes();

    match nodes.add(node) {
        Ok(true) => match nodes.get(&address) {
            Some(node) => ok(&NodeAdded {
                node,
                total: nodes.len(),
            }),
            None => error_reply(&BlockchainError::NotFound(address)),
        },
        Ok(false) => json_reply(
            &ErrorResponse {
                error: format!("Node {address} is already registered"),
            },
            StatusCode::CONFLICT,
        ),
        Err(e) => error_reply(&e),
    }
}

async fn list_nodes(state: NodeState) -> Response {
    let list = state.gossip.get_nodes().get_nodes();
    ok(&NodeList {
        length: list.len(),
        list,
    })
}

// A client submission: the receiving node decides the time
async fn submit_transaction(body: Bytes, state: NodeState) -> Response {
    let admitted = deserialize::<Transaction>(&body)
        .and_then(|tr| state.blockchain.admit(tr.without_time()));
    match admitted {
        Ok(tr) => {
            state.gossip.broadcast_transaction(&tr);
            text("Transaction added")
        }
        Err(e) => error_reply(&e),
    }
}

// A relayed transaction keeps its time so every node computes the same hash
async fn receive_transaction(body: Bytes, state: NodeState) -> Response {
    let envelope: TransactionEnvelope = match deserialize(&body) {
        Ok(envelope) => envelope,
        Err(e) => return error_reply(&e),
    };
    match state.blockchain.admit(envelope.transaction) {
        Ok(_) => text("Transaction added"),
        Err(BlockchainError::DuplicateTransaction(_)) => text("Transaction already known"),
        Err(e) => {
            warn!("Rejected a transaction from {}: {e}", envelope.sender);
            error_reply(&e)
        }
    }
}

async fn pending_transactions(state: NodeState) -> Response {
    ok(&state.blockchain.pending())
}

async fn wallet_history(hash: String, state: NodeState) -> Response {
    respond(check_hash(&hash).map(|_| HistoryResponse {
        success: true,
        transactions: state.blockchain.transactions_of(&hash),
    }))
}

async fn wallet_credit(hash: String, state: NodeState) -> Response {
    respond(check_hash(&hash).map(|_| CreditResponse {
        success: true,
        credit: state.blockchain.balance_of(&hash),
    }))
}

async fn last_block(state: NodeState) -> Response {
    match state.blockchain.last_block() {
        Some(block) => ok(&BlockResponse {
            success: true,
            block,
        }),
        None => error_reply(&BlockchainError::NotFound("the chain is empty".to_string())),
    }
}

async fn block_by_hash(hash: String, state: NodeState) -> Response {
    match state.blockchain.block_by_hash(&hash) {
        Some(block) => ok(&BlockResponse {
            success: true,
            block,
        }),
        None => error_reply(&BlockchainError::NotFound(format!("block {hash}"))),
    }
}

async fn block_by_index(index: u64, state: NodeState) -> Response {
    match state.blockchain.block_by_index(index) {
        Some(block) => ok(&block),
        None => error_reply(&BlockchainError::NotFound(format!("block {index}"))),
    }
}

// An announced block either extends my chain directly, or it is ahead of me
// and I fetch what I am missing from the peer that announced it
async fn receive_block(body: Bytes, state: NodeState) -> Response {
    let BlockEnvelope { block, sender } = match deserialize::<BlockEnvelope>(&body) {
        Ok(envelope) => envelope,
        Err(e) => return error_reply(&e),
    };
    let index = block.get_index();

    let rejection = match state.blockchain.add_block(block) {
        Ok(_) => return text("Block added"),
        Err(e) => e,
    };

    if index > state.blockchain.last_index() + 1 {
        let client = state.gossip.get_client();
        return match state.blockchain.backfill(index, &sender, client).await {
            Ok(added) => text(format!("Backfilled {added} blocks")),
            Err(e) => error_reply(&e),
        };
    }
    warn!("Rejected block {index} from {sender}: {rejection}");
    error_reply(&rejection)
}

async fn full_chain(state: NodeState) -> Response {
    let (chain, transactions) = state.blockchain.snapshot();
    ok(&ChainResponse {
        length: chain.len(),
        chain,
        transactions,
    })
}

async fn status(state: NodeState) -> Response {
    let hash = state.blockchain.last_block().and_then(|block| block.hash().ok());
    ok(&StatusResponse {
        length: state.blockchain.len(),
        hash,
    })
}

// The proof search is CPU bound, so it runs on a blocking worker
async fn mine(state: NodeState) -> Response {
    let blockchain = state.blockchain.clone();
    let mined = tokio::task::spawn_blocking(move || blockchain.mine())
        .await
        .map_err(|e| BlockchainError::Mining(format!("mining worker failed: {e}")))
        .and_then(|result| result);
    respond(mined)
}

async fn resolve(state: NodeState) -> Response {
    ok(&state.resolver.resolve(&state.blockchain).await)
}

async fn validate(state: NodeState) -> Response {
    ok(&ValidateResponse {
        valid: state.blockchain.validate(),
        length: state.blockchain.len(),
    })
}

async fn handle_rejection(err: Rejection) -> std::result::Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_reply(&BlockchainError::NotFound(
            "no such endpoint".to_string(),
        )));
    }
    // body limits come first; the other routes on the same path add MethodNotAllowed
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(json_reply(
            &ErrorResponse {
                error: format!("request body is larger than {MAX_BODY_BYTES} bytes"),
            },
            StatusCode::PAYLOAD_TOO_LARGE,
        ));
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        return Ok(json_reply(
            &ErrorResponse {
                error: "a content-length header is required".to_string(),
            },
            StatusCode::LENGTH_REQUIRED,
        ));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_reply(
            &ErrorResponse {
                error: "Method not allowed".to_string(),
            },
            StatusCode::METHOD_NOT_ALLOWED,
        ));
    }
    debug!("Unhandled rejection: {err:?}");
    Ok(error_reply(&BlockchainError::InvalidFormat(
        "malformed request".to_string(),
    )))
}

pub fn routes(
    state: NodeState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let hello = warp::path::end()
        .and(warp::get())
        .map(|| text("Hello world"));
    let node_post = warp::path!("node")
        .and(warp::post())
        .and(body())
        .and(with_state(state.clone()))
        .then(register_node);
    let node_get = warp::path!("node")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(list_nodes);
    let transaction = warp::path!("transaction")
        .and(warp::post())
        .and(body())
        .and(with_state(state.clone()))
        .then(submit_transaction);
    let transaction_distributed = warp::path!("transaction" / "distributed")
        .and(warp::post())
        .and(body())
        .and(with_state(state.clone()))
        .then(receive_transaction);
    let transactions = warp::path!("transactions")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(pending_transactions);
    let history = warp::path!("transactions" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(wallet_history);
    let wallet = warp::path!("wallet" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(wallet_credit);

    let block = warp::path!("block")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(last_block);
    let block_hash = warp::path!("block" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(block_by_hash);
    let block_index = warp::path!("block" / "index" / u64)
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(block_by_index);
    let block_distributed = warp::path!("block" / "distributed")
        .and(warp::post())
        .and(body())
        .and(with_state(state.clone()))
        .then(receive_block);
    let chain = warp::path!("chain")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(full_chain);
    let status_route = warp::path!("status")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(status);
    let mine_route = warp::path!("mine")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(mine);
    let resolve_route = warp::path!("resolve")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(resolve);
    let validate_route = warp::path!("validate")
        .and(warp::get())
        .and(with_state(state))
        .then(validate);

    // boxed in groups to keep the combined filter type shallow
    let membership = hello
        .boxed()
        .or(node_post.boxed())
        .unify()
        .or(node_get.boxed())
        .unify()
        .boxed();
    let transfers = transaction
        .boxed()
        .or(transaction_distributed.boxed())
        .unify()
        .or(transactions.boxed())
        .unify()
        .or(history.boxed())
        .unify()
        .or(wallet.boxed())
        .unify()
        .boxed();
    let blocks = block_index
        .boxed()
        .or(block_distributed.boxed())
        .unify()
        .or(block.boxed())
        .unify()
        .or(block_hash.boxed())
        .unify()
        .boxed();
    let ledger = chain
        .boxed()
        .or(status_route.boxed())
        .unify()
        .or(mine_route.boxed())
        .unify()
        .or(resolve_route.boxed())
        .unify()
        .or(validate_route.boxed())
        .unify()
        .boxed();

    membership
        .or(transfers)
        .unify()
        .or(blocks)
        .unify()
        .or(ledger)
        .unify()
        .recover(handle_rejection)
}

pub struct Server {
    config: Config,
    state: NodeState,
}

impl Server {
    // Startup order: who am I, who else is out there, tell them about me,
    // then build (or fetch) the ledger
    pub async fn bootstrap(config: Config) -> Result<Server> {
        let wallet = Wallet::new()?;
        let me = Node::new(
            &config.node.hostname,
            &config.node.protocol,
            config.node.port,
            &config.node.name,
            wallet.get_hash(),
        );
        info!(
            "Starting node {} at {} with wallet {}",
            me.get_name(),
            me.address(),
            wallet.get_hash()
        );

        let client = PeerClient::new(config.peer_timeout())?;
        let gossip = Arc::new(Gossip::new(
            me,
            client,
            &config.bootstrap_address(),
            config.is_bootstrap(),
            config.network.max_outbound_requests,
        )?);
        if !gossip.sync_from_bootstrap().await {
            warn!(
                "Could not reach the bootstrap node at {}",
                config.bootstrap_address()
            );
        }
        gossip.announce_self_to_all();

        let resolver = Arc::new(Resolver::new(
            gossip.clone(),
            config.network.max_status_polls,
        ));
        let options = BlockchainOptions::new(
            config.mining.difficulty,
            wallet.get_hash(),
            &config.node_address(),
        )
        .with_incentive(config.mining.incentive);
        let blockchain =
            Blockchain::initialize(config.is_bootstrap(), options, gossip.clone(), &resolver)
                .await?;

        Ok(Server {
            config,
            state: NodeState {
                blockchain,
                gossip,
                resolver,
            },
        })
    }

    pub fn get_state(&self) -> &NodeState {
        &self.state
    }

    /// Binds the listening socket now and returns the future that serves it.
    /// Serving ends once `shutdown` completes.
    pub fn bind(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.config.node.port).into();
        warp::serve(routes(self.state.clone()))
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| BlockchainError::Io(format!("binding {addr}: {e}")))
    }

    pub async fn run(self) -> Result<()> {
        let blockchain = self.state.blockchain.clone();
        let shutdown = async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutting down"),
                Err(e) => {
                    error!("Could not listen for the shutdown signal: {e}");
                    std::future::pending::<()>().await;
                }
            }
            blockchain.stop_mining();
        };

        let (addr, serving) = self.bind(shutdown)?;
        info!("Listening on {addr}");
        serving.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::node::DEFAULT_PROTOCOL;
    use crate::testnet::{create_test_blockchain, ALICE};
    use std::time::Duration;

    fn test_state() -> NodeState {
        let me = Node::new("127.0.0.1", DEFAULT_PROTOCOL, 8000, "local", "");
        let client = PeerClient::new(Duration::from_millis(200)).unwrap();
        let gossip = Arc::new(Gossip::new(me, client, "http://127.0.0.1:8000", true, 4).unwrap());
        NodeState {
            blockchain: create_test_blockchain(1),
            resolver: Arc::new(Resolver::new(gossip.clone(), 2)),
            gossip,
        }
    }

    fn error_of(body: &[u8]) -> String {
        serde_json::from_slice::<ErrorResponse>(body).unwrap().error
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let state = test_state();
        let api = routes(state.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/transaction")
            .header("content-length", (MAX_BODY_BYTES + 1).to_string())
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error_of(response.body()).contains("larger than"));
        assert!(state.blockchain.pending().is_empty());
    }

    #[tokio::test]
    async fn test_rejections_have_readable_reasons() {
        let api = routes(test_state());

        let wrong_method = warp::test::request()
            .method("DELETE")
            .path("/chain")
            .reply(&api)
            .await;
        assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);

        let missing = warp::test::request().path("/nowhere").reply(&api).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let unsized_body = warp::test::request()
            .method("POST")
            .path("/transaction")
            .reply(&api)
            .await;
        assert_eq!(unsized_body.status(), StatusCode::LENGTH_REQUIRED);
        assert_eq!(
            error_of(unsized_body.body()),
            "a content-length header is required"
        );
    }

    #[tokio::test]
    async fn test_wallet_credit_route() {
        let state = test_state();
        let api = routes(state.clone());
        state
            .blockchain
            .admit(Transaction::new_coinbase_tx(ALICE, 2.0, "").unwrap())
            .unwrap();

        let response = warp::test::request()
            .path(&format!("/wallet/{ALICE}"))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let credit: CreditResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(credit.credit, 2.0);
    }
}
