// This is the ledger - the chain of blocks plus the pool of pending transactions
// Everything lives in memory. One RwLock guards both the chain and the pool, so
// mining, block announcements, resolution and admissions never interleave.
// Reads (validation, balances, serving the chain) share the lock.

use crate::core::consensus::Resolver;
use crate::core::identity::ZERO_HASH;
use crate::core::monetary::{GENESIS_PROOF, MINING_INCENTIVE};
use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::PeerClient;
use crate::storage::MemoryPool;
use crate::wallet;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Receives every block this ledger creates, so it can be announced to peers.
pub trait Broadcaster: Send + Sync {
    fn broadcast_block(&self, block: &Block);
}

/// Broadcaster for a ledger that has nobody to talk to.
pub struct NoBroadcast;

impl Broadcaster for NoBroadcast {
    fn broadcast_block(&self, _block: &Block) {}
}

/// How this ledger mines and whom it pays.
#[derive(Debug, Clone)]
pub struct BlockchainOptions {
    pub pow: ProofOfWork,
    pub incentive: f64,
    /// Wallet hash credited with the mining incentive
    pub miner_hash: String,
    /// Address of the mining node, recorded in the incentive message
    pub miner_address: String,
}

impl BlockchainOptions {
    pub fn new(difficulty: usize, miner_hash: &str, miner_address: &str) -> BlockchainOptions {
        BlockchainOptions {
            pow: ProofOfWork::new(difficulty),
            incentive: MINING_INCENTIVE,
            miner_hash: miner_hash.to_string(),
            miner_address: miner_address.to_string(),
        }
    }

    pub fn with_incentive(mut self, incentive: f64) -> BlockchainOptions {
        self.incentive = incentive;
        self
    }
}

#[derive(Default)]
struct ChainState {
    chain: Vec<Block>,
    pool: MemoryPool,
}

impl ChainState {
    fn last_index(&self) -> u64 {
        self.chain.last().map(Block::get_index).unwrap_or(0)
    }

    fn admit(&mut self, mut tr: Transaction) -> Result<Transaction> {
        let txid = tr.get_hash();
        if self.pool.contains(&txid) {
            return Err(BlockchainError::DuplicateTransaction(txid));
        }
        tr.validate(&self.chain, self.pool.get_all())?;
        tr.stamp_if_unset()?;
        self.pool.add(tr.clone());
        Ok(tr)
    }

    // Builds a block from the whole pool on top of the current last block
    fn append_new_block(&mut self, proof: i64) -> Result<Block> {
        let previous_hash = match self.chain.last() {
            Some(last) => last.hash()?,
            None => ZERO_HASH.to_string(),
        };
        let index = self.chain.len() as u64 + 1;
        let block = Block::new_block(index, self.pool.drain(), proof, previous_hash)?;
        self.chain.push(block.clone());
        Ok(block)
    }

    fn check_candidate(&self, pow: &ProofOfWork, candidate: &Block) -> Result<()> {
        let index = candidate.get_index();
        let reject = |reason: String| BlockchainError::InvalidProof { index, reason };

        let last = match self.chain.last() {
            Some(last) => last,
            // an empty ledger can only start from a first block
            None if index == 1 => return Ok(()),
            None => return Err(reject("the local chain is empty".to_string())),
        };
        if !pow.valid_proof(last.get_proof(), candidate.get_proof()) {
            return Err(reject(format!(
                "proof {} does not follow proof {} of block {}",
                candidate.get_proof(),
                last.get_proof(),
                last.get_index()
            )));
        }
        if index != last.get_index() + 1 {
            return Err(reject(format!(
                "expected index {}, local chain ends at {}",
                last.get_index() + 1,
                last.get_index()
            )));
        }
        let last_hash = last.hash()?;
        if candidate.get_previous_hash() != last_hash {
            return Err(reject(format!(
                "previous hash {} does not match {}",
                candidate.get_previous_hash(),
                last_hash
            )));
        }
        Ok(())
    }
}

/// A ledger starts at index 1 and counts up by one.
fn has_contiguous_indices(chain: &[Block]) -> bool {
    match chain.first() {
        Some(first) if first.get_index() != 1 => false,
        _ => chain
            .windows(2)
            .all(|pair| pair[1].get_index() == pair[0].get_index() + 1),
    }
}

/// Checks the links and proofs of every adjacent pair of blocks.
pub fn validate_chain(pow: &ProofOfWork, chain: &[Block]) -> bool {
    for pair in chain.windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);

        let linked = match previous.hash() {
            Ok(hash) => current.get_previous_hash() == hash,
            Err(_) => false,
        };
        if !linked {
            warn!(
                "Invalid hash: block {} does not link to block {}",
                current.get_index(),
                previous.get_index()
            );
            return false;
        }

        if !pow.valid_proof(previous.get_proof(), current.get_proof()) {
            warn!(
                "Invalid proof: block {} after block {}",
                current.get_index(),
                previous.get_index()
            );
            return false;
        }
    }
    true
}

// This is the handle every request handler and background task shares
#[derive(Clone)]
pub struct Blockchain {
    state: Arc<RwLock<ChainState>>,
    options: Arc<BlockchainOptions>,
    broadcaster: Arc<dyn Broadcaster>,
    stop: Arc<AtomicBool>,
}

impl Blockchain {
    // An empty ledger, waiting for a chain from the network
    pub fn new(options: BlockchainOptions, broadcaster: Arc<dyn Broadcaster>) -> Blockchain {
        Blockchain {
            state: Arc::new(RwLock::new(ChainState::default())),
            options: Arc::new(options),
            broadcaster,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    // The bootstrap node starts the network with a genesis block
    pub fn create_genesis(
        options: BlockchainOptions,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Blockchain> {
        let blockchain = Self::new(options, broadcaster);
        let genesis = blockchain.new_block(GENESIS_PROOF)?;
        info!("Adding genesis block: {genesis:?}");
        Ok(blockchain)
    }

    // Every other node starts empty and asks its peers for their chain
    pub async fn initialize(
        is_bootstrap: bool,
        options: BlockchainOptions,
        broadcaster: Arc<dyn Broadcaster>,
        resolver: &Resolver,
    ) -> Result<Blockchain> {
        if is_bootstrap {
            return Self::create_genesis(options, broadcaster);
        }

        let blockchain = Self::new(options, broadcaster);
        if resolver.resolve(&blockchain).await {
            info!("Resolved an initial chain of {} blocks", blockchain.len());
        } else {
            warn!("No peer offered a chain, starting empty");
        }
        let adopted = resolver.adopt_pending_transactions(&blockchain).await;
        info!("Adopted {adopted} pending transactions from the network");
        Ok(blockchain)
    }

    fn read(&self) -> RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_options(&self) -> &BlockchainOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.read().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().chain.is_empty()
    }

    pub fn last_block(&self) -> Option<Block> {
        self.read().chain.last().cloned()
    }

    /// Index of the last block, 0 for an empty chain.
    pub fn last_index(&self) -> u64 {
        self.read().last_index()
    }

    pub fn block_by_index(&self, index: u64) -> Option<Block> {
        self.read()
            .chain
            .iter()
            .find(|block| block.get_index() == index)
            .cloned()
    }

    pub fn block_by_hash(&self, hash: &str) -> Option<Block> {
        self.read()
            .chain
            .iter()
            .find(|block| block.hash().map(|h| h == hash).unwrap_or(false))
            .cloned()
    }

    /// A consistent copy of the chain and the pool, taken under one lock.
    pub fn snapshot(&self) -> (Vec<Block>, Vec<Transaction>) {
        let state = self.read();
        (state.chain.clone(), state.pool.get_all().to_vec())
    }

    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.read().chain.clone()
    }

    pub fn pending(&self) -> Vec<Transaction> {
        self.read().pool.get_all().to_vec()
    }

    pub fn balance_of(&self, hash: &str) -> f64 {
        let state = self.read();
        wallet::balance_of(hash, &state.chain, state.pool.get_all())
    }

    pub fn transactions_of(&self, hash: &str) -> Vec<Transaction> {
        wallet::transactions_of(hash, &self.read().chain)
    }

    pub fn is_duplicate(&self, tr: &Transaction) -> bool {
        self.read().pool.contains(&tr.get_hash())
    }

    /// Validates and pools a transaction, stamping its time if unset.
    pub fn admit(&self, tr: Transaction) -> Result<Transaction> {
        let admitted = self.write().admit(tr)?;
        info!("Transaction {} added to the pool", admitted.get_hash());
        Ok(admitted)
    }

    /// Drops pooled transactions that `confirmed` already contains.
    pub fn prune(&self, confirmed: &[Transaction]) -> usize {
        self.write().pool.prune(confirmed)
    }

    // I build a block from everything in the pool, append it and announce it
    pub fn new_block(&self, proof: i64) -> Result<Block> {
        let block = self.write().append_new_block(proof)?;
        self.broadcaster.broadcast_block(&block);
        Ok(block)
    }

    // When a peer announces a block I only take it if it extends my last block
    pub fn add_block(&self, candidate: Block) -> Result<Block> {
        let mut state = self.write();
        state.check_candidate(&self.options.pow, &candidate)?;
        state.chain.push(candidate.clone());
        let pruned = state.pool.prune(candidate.get_transactions());
        drop(state);

        info!(
            "Added block {} due to an announcement ({pruned} pending transactions confirmed)",
            candidate.get_index()
        );
        Ok(candidate)
    }

    // When an announced block is further ahead than the next index, I fetch the
    // missing blocks one by one from the peer that announced it
    pub async fn backfill(
        &self,
        candidate_index: u64,
        sender: &str,
        client: &PeerClient,
    ) -> Result<usize> {
        let last_index = self.last_index();
        if candidate_index <= last_index + 1 {
            return Err(BlockchainError::BackfillFailed(format!(
                "block {candidate_index} is not ahead of local block {last_index}"
            )));
        }

        info!("Backfilling blocks {} to {candidate_index} from {sender}", last_index + 1);
        let mut added = 0;
        for index in last_index + 1..=candidate_index {
            let block = client.block_by_index(sender, index).await.map_err(|e| {
                warn!("Could not fetch block {index} from {sender}: {e}");
                BlockchainError::BackfillFailed(format!("fetching block {index}: {e}"))
            })?;
            self.add_block(block).map_err(|e| {
                warn!("Could not add block {index} from {sender}: {e}");
                BlockchainError::BackfillFailed(format!("adding block {index}: {e}"))
            })?;
            added += 1;
        }
        info!("Successfully added {added} blocks from {sender}");
        Ok(added)
    }

    pub fn validate(&self) -> bool {
        validate_chain(&self.options.pow, &self.read().chain)
    }

    // Mining: search a proof without holding the lock, then pay myself and
    // seal the pool into a block. If the chain moved while I was searching,
    // the proof no longer fits and I search again.
    pub fn mine(&self) -> Result<Block> {
        loop {
            let last_proof = self
                .last_block()
                .ok_or(BlockchainError::EmptyChain)?
                .get_proof();

            let proof = self
                .options
                .pow
                .solve(last_proof, &self.stop)
                .ok_or_else(|| BlockchainError::Mining("proof search cancelled".to_string()))?;

            let mut state = self.write();
            let current_proof = state
                .chain
                .last()
                .ok_or(BlockchainError::EmptyChain)?
                .get_proof();
            if !self.options.pow.valid_proof(current_proof, proof) {
                warn!("Chain moved while mining, searching again");
                continue;
            }

            let reward = Transaction::new_coinbase_tx(
                &self.options.miner_hash,
                self.options.incentive,
                &format!("Mined by {}", self.options.miner_address),
            )?;
            state.admit(reward)?;
            let block = state.append_new_block(proof)?;
            drop(state);

            info!(
                "New block {} mined with {} transactions",
                block.get_index(),
                block.get_transactions().len()
            );
            self.broadcaster.broadcast_block(&block);
            return Ok(block);
        }
    }

    /// Cancels any running and future proof search.
    pub fn stop_mining(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    // Tentatively swap in a longer chain; keep it only if it validates
    pub fn adopt_chain(&self, candidate: Vec<Block>) -> bool {
        let mut state = self.write();
        let current_len = state.chain.len();
        if candidate.len() <= current_len {
            return false;
        }
        if !has_contiguous_indices(&candidate) {
            warn!("Rejected a chain whose block indices do not count up from 1");
            return false;
        }

        let previous = std::mem::replace(&mut state.chain, candidate);
        if !validate_chain(&self.options.pow, &state.chain) {
            state.chain = previous;
            return false;
        }

        let confirmed: Vec<Transaction> = state
            .chain
            .iter()
            .flat_map(|block| block.get_transactions().iter().cloned())
            .collect();
        state.pool.prune(&confirmed);
        info!(
            "Blockchain replaced. Found length of {} instead of current {current_len}",
            state.chain.len()
        );
        true
    }
}
