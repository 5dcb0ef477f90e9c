//! Shared ledger service for concurrent callers.
//!
//! One `RwLock` guards the ledger. Admission and block commits take the write
//! lock; the proof-of-work search runs on a blocking thread with no lock held,
//! and its result is committed only if the tip has not moved.

use crate::amount::Amount;
use crate::blockchain::{Block, Blockchain};
use crate::config::Config;
use crate::error::ChainError;
use crate::mempool::{PendingEntry, PendingId};
use crate::miner::{proof_of_work_cancellable, CancelFlag};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use secp256k1::PublicKey;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct LedgerService {
    ledger: Arc<RwLock<Blockchain>>,
    /// Stop signal of the active mining run, if any
    current_run: Arc<Mutex<Option<CancelFlag>>>,
    blocks_mined: Arc<AtomicU64>,
    check_interval: u64,
}

/// Ends a mining run when dropped: the search is told to stop (a no-op once it
/// has finished) and the run slot is freed.
struct MiningRun {
    slot: Arc<Mutex<Option<CancelFlag>>>,
    cancel: CancelFlag,
}

impl Drop for MiningRun {
    fn drop(&mut self) {
        self.cancel.cancel();
        *self.slot.lock() = None;
    }
}

impl LedgerService {
    pub fn new(chain: Blockchain, check_interval: u64) -> Self {
        LedgerService {
            ledger: Arc::new(RwLock::new(chain)),
            current_run: Arc::new(Mutex::new(None)),
            blocks_mined: Arc::new(AtomicU64::new(0)),
            check_interval: check_interval.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Blockchain::from_config(config), config.miner.check_interval)
    }

    /// Direct access to the shared ledger for callers composing several
    /// reads under one lock.
    pub fn ledger(&self) -> Arc<RwLock<Blockchain>> {
        self.ledger.clone()
    }

    pub async fn submit(&self, tx: Transaction) -> Result<PendingId, ChainError> {
        let mut chain = self.ledger.write().await;
        chain.submit(tx).inspect_err(|e| warn!(reason = %e, "transaction rejected"))
    }

    /// Queues a `SYSTEM` grant of `amount` to `recipient`.
    pub async fn issue(&self, recipient: PublicKey, amount: Amount) -> Result<PendingId, ChainError> {
        self.submit(Transaction::issuance(recipient, amount)).await
    }

    /// Mines every pending transaction into one block paying `miner`.
    ///
    /// Fails with `MiningAlreadyRunning` while another run is active and with
    /// `MiningCancelled` after [`LedgerService::stop_mining`]; in both cases
    /// the chain and pool are untouched.
    pub async fn mine(&self, miner: PublicKey) -> Result<Block, ChainError> {
        let cancel = {
            let mut slot = self.current_run.lock();
            if slot.is_some() {
                return Err(ChainError::MiningAlreadyRunning);
            }
            let cancel = CancelFlag::new();
            *slot = Some(cancel.clone());
            cancel
        };
        let _run = MiningRun {
            slot: self.current_run.clone(),
            cancel: cancel.clone(),
        };

        let (mut candidate, difficulty) = {
            let chain = self.ledger.read().await;
            (chain.prepare_candidate(&miner), chain.difficulty())
        };
        info!(
            index = candidate.block.index(),
            transactions = candidate.block.transactions.len(),
            difficulty,
            "mining block"
        );

        let interval = self.check_interval;
        let (candidate, found) = tokio::task::spawn_blocking(move || {
            let found =
                proof_of_work_cancellable(&mut candidate.block, difficulty, &cancel, interval);
            (candidate, found)
        })
        .await
        .map_err(|e| ChainError::InvalidBlock(format!("mining task failed: {}", e)))?;

        let (hash, nonce) = found.ok_or_else(|| {
            info!("mining cancelled");
            ChainError::MiningCancelled
        })?;

        let block = self
            .ledger
            .write()
            .await
            .commit_candidate(candidate, hash, nonce)?;
        self.blocks_mined.fetch_add(1, Ordering::Relaxed);
        Ok(block)
    }

    /// Signals an active run to stop. Returns `false` when nothing is mining.
    pub fn stop_mining(&self) -> bool {
        match self.current_run.lock().as_ref() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_mining(&self) -> bool {
        self.current_run.lock().is_some()
    }

    /// Blocks mined through this service since it started.
    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    pub async fn balance(&self, key: &PublicKey) -> Amount {
        self.ledger.read().await.get_balance(key)
    }

    pub async fn balances(&self) -> BTreeMap<PublicKey, Amount> {
        self.ledger.read().await.balances()
    }

    pub async fn validate(&self) -> Result<(), ChainError> {
        self.ledger.read().await.validate_chain()
    }

    pub async fn dump_chain(&self) -> Vec<Block> {
        self.ledger.read().await.dump_chain()
    }

    pub async fn pending(&self) -> Vec<PendingEntry> {
        self.ledger.read().await.pending()
    }

    pub async fn height(&self) -> usize {
        self.ledger.read().await.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use std::time::Duration;

    fn service(difficulty: u32) -> LedgerService {
        LedgerService::new(Blockchain::new(difficulty, Amount::from_coins(25)), 64)
    }

    #[tokio::test]
    async fn test_submit_and_mine() {
        let service = service(1);
        let alice = KeyPair::generate();
        let miner = KeyPair::generate();

        service
            .issue(alice.public_key(), Amount::from_coins(100))
            .await
            .unwrap();
        assert_eq!(service.pending().await.len(), 1);

        let block = service.mine(miner.public_key()).await.unwrap();
        assert_eq!(block.index(), 1);
        assert_eq!(service.height().await, 2);
        assert!(service.pending().await.is_empty());
        assert_eq!(
            service.balance(&alice.public_key()).await,
            Amount::from_coins(100)
        );
        assert_eq!(
            service.balance(&miner.public_key()).await,
            Amount::from_coins(25)
        );
        assert_eq!(service.blocks_mined(), 1);
        assert!(!service.is_mining());
        assert!(service.validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_without_run_is_noop() {
        let service = service(1);
        assert!(!service.stop_mining());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_cancels_running_search() {
        // 64 leading zero digits is unreachable, so only cancellation ends it
        let service = service(64);
        let miner = KeyPair::generate().public_key();

        let runner = service.clone();
        let handle = tokio::spawn(async move { runner.mine(miner).await });

        let mut stopped = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if service.stop_mining() {
                stopped = true;
                break;
            }
        }
        assert!(stopped);

        let result = handle.await.unwrap();
        assert_eq!(result, Err(ChainError::MiningCancelled));
        assert_eq!(service.height().await, 1);
        assert!(!service.is_mining());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_run_is_rejected_while_mining() {
        let service = service(64);
        let miner = KeyPair::generate().public_key();

        let runner = service.clone();
        let handle = tokio::spawn(async move { runner.mine(miner).await });
        for _ in 0..200 {
            if service.is_mining() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            service.mine(miner).await,
            Err(ChainError::MiningAlreadyRunning)
        );
        assert!(service.stop_mining());
        assert_eq!(handle.await.unwrap(), Err(ChainError::MiningCancelled));
    }
}
