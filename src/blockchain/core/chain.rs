use crate::amount::Amount;
use crate::canonical::{hex_hash, now_millis, to_canonical_json};
use crate::config::Config;
use crate::crypto::{sha256, Sha256Hash};
use crate::error::ChainError;
use crate::mempool::{Mempool, PendingEntry, PendingId};
use crate::miner::{meets_difficulty, proof_of_work, proof_of_work_cancellable, CancelFlag, MAX_DIFFICULTY};
use crate::transaction::{Identity, Transaction};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::merkle::merkle_root;
use super::state::{balance_of, BalanceSheet};
use super::validation::{validate_blocks, IntegrityViolation};

/// `previous_hash` of the genesis block (64 zero hex digits).
pub const GENESIS_PREVIOUS_HASH: Sha256Hash = [0u8; 32];
/// 2023-01-01T00:00:00Z, so every ledger shares one genesis hash.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub index: u64,
    #[serde(with = "hex_hash")]
    pub previous_hash: Sha256Hash,
    /// Unix milliseconds
    pub timestamp: u64,
    pub nonce: u64,
    #[serde(with = "hex_hash")]
    pub merkle_root: Sha256Hash,
}

impl BlockHeader {
    pub fn canonical_payload(&self) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("index", Value::from(self.index));
        fields.insert("merkle_root", Value::String(hex::encode(self.merkle_root)));
        fields.insert("nonce", Value::from(self.nonce));
        fields.insert("previous_hash", Value::String(hex::encode(self.previous_hash)));
        fields.insert("timestamp", Value::from(self.timestamp));
        to_canonical_json(fields)
    }

    pub fn hash(&self) -> Sha256Hash {
        sha256(self.canonical_payload().as_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    #[serde(with = "hex_hash")]
    pub hash: Sha256Hash,
}

impl Block {
    pub fn new(index: u64, previous_hash: Sha256Hash, transactions: Vec<Transaction>) -> Self {
        let header = BlockHeader {
            index,
            previous_hash,
            timestamp: now_millis(),
            nonce: 0,
            merkle_root: merkle_root(&transactions),
        };
        let hash = header.hash();
        Block {
            header,
            transactions,
            hash,
        }
    }

    /// The fixed first block shared by every ledger.
    pub fn genesis() -> Self {
        let transactions = Vec::new();
        let header = BlockHeader {
            index: 0,
            previous_hash: GENESIS_PREVIOUS_HASH,
            timestamp: GENESIS_TIMESTAMP,
            nonce: 0,
            merkle_root: merkle_root(&transactions),
        };
        let hash = header.hash();
        Block {
            header,
            transactions,
            hash,
        }
    }

    /// Hash of the header fields with the Merkle root recomputed from the
    /// current transaction list, so any edit to a transaction shows up here.
    pub fn compute_hash(&self) -> Sha256Hash {
        let mut header = self.header.clone();
        header.merkle_root = merkle_root(&self.transactions);
        header.hash()
    }

    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn previous_hash_str(&self) -> String {
        hex::encode(self.header.previous_hash)
    }

    pub fn merkle_root_str(&self) -> String {
        hex::encode(self.header.merkle_root)
    }
}

/// A block assembled from a pool snapshot, waiting for its proof of work.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub block: Block,
    included: Vec<PendingId>,
    tip_hash: Sha256Hash,
}

impl Candidate {
    /// Ids of the pending entries this block will confirm.
    pub fn included(&self) -> &[PendingId] {
        &self.included
    }
}

/// Append-only chain of blocks plus the pool of transactions waiting for the
/// next one.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    mempool: Mempool,
    difficulty: u32,
    mining_reward: Amount,
}

impl Blockchain {
    pub fn new(difficulty: u32, mining_reward: Amount) -> Self {
        Self::with_mempool(difficulty, mining_reward, Mempool::new())
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_mempool(
            config.ledger.difficulty,
            config.ledger.mining_reward,
            Mempool::with_capacity_limit(config.mempool.max_size),
        )
    }

    fn with_mempool(difficulty: u32, mining_reward: Amount, mempool: Mempool) -> Self {
        let difficulty = difficulty.min(MAX_DIFFICULTY);
        let mining_reward = if mining_reward.is_negative() {
            tracing::warn!(reward = %mining_reward, "negative mining reward, using 0");
            Amount::ZERO
        } else {
            mining_reward
        };
        let genesis = Block::genesis();
        tracing::info!(
            difficulty,
            reward = %mining_reward,
            genesis = %genesis.hash_str(),
            "ledger initialised"
        );
        Blockchain {
            blocks: vec![genesis],
            mempool,
            difficulty,
            mining_reward,
        }
    }

    /// Boolean admission: `true` when `tx` was queued. The rejection reason is
    /// logged; use [`Blockchain::submit`] to receive it.
    pub fn add_transaction(&mut self, tx: Transaction) -> bool {
        match self.submit(tx) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(reason = %e, "transaction rejected");
                false
            }
        }
    }

    /// Validates `tx` against confirmed balances minus what is already
    /// pending, and queues it. Nothing changes on error.
    pub fn submit(&mut self, tx: Transaction) -> Result<PendingId, ChainError> {
        tx.validate_structure()?;

        if let Identity::Key(sender) = tx.sender {
            tx.verify()?;

            let confirmed = self.get_balance(&sender);
            let available = confirmed - self.mempool.pending_spend(&tx.sender);
            let required = tx.total_debit();
            if required > available {
                return Err(ChainError::InsufficientFunds {
                    required,
                    available,
                });
            }
        }

        // The recipient's confirmed plus pending credits must stay in range.
        self.get_balance(&tx.recipient)
            .checked_add(self.mempool.pending_credit(&tx.recipient))
            .and_then(|balance| balance.checked_add(tx.amount))
            .ok_or_else(|| {
                ChainError::InvalidAmount(format!(
                    "credit of {} would overflow the balance of {}",
                    tx.amount, tx.recipient
                ))
            })?;

        let hash = tx.hash_str();
        let id = self.mempool.add(tx)?;
        tracing::debug!(id = %id, tx = %hash, pending = self.mempool.len(), "transaction admitted");
        Ok(id)
    }

    /// Snapshots the pool into a candidate on top of the current tip, with a
    /// reward of `mining_reward` plus all included fees for `miner` appended
    /// last.
    pub fn prepare_candidate(&self, miner: &PublicKey) -> Candidate {
        let entries = self.mempool.snapshot();
        let fees: Amount = entries.iter().map(|entry| entry.transaction.fee).sum();
        let included = entries.iter().map(|entry| entry.id).collect();

        let mut transactions: Vec<Transaction> =
            entries.into_iter().map(|entry| entry.transaction).collect();
        transactions.push(Transaction::issuance(*miner, self.mining_reward + fees));

        let tip = self.tip();
        Candidate {
            block: Block::new(tip.index() + 1, tip.hash, transactions),
            included,
            tip_hash: tip.hash,
        }
    }

    /// Seals `candidate` with a found `hash` and `nonce` and appends it,
    /// provided the chain has not moved on since the candidate was prepared.
    pub fn commit_candidate(
        &mut self,
        mut candidate: Candidate,
        hash: Sha256Hash,
        nonce: u64,
    ) -> Result<Block, ChainError> {
        if candidate.tip_hash != self.tip().hash {
            return Err(ChainError::StaleCandidate);
        }
        if !meets_difficulty(&hash, self.difficulty) {
            return Err(ChainError::InvalidBlock(format!(
                "hash {} does not meet difficulty {}",
                hex::encode(hash),
                self.difficulty
            )));
        }

        candidate.block.header.nonce = nonce;
        candidate.block.header.merkle_root = merkle_root(&candidate.block.transactions);
        if candidate.block.compute_hash() != hash {
            return Err(ChainError::InvalidBlock(format!(
                "hash {} does not match block contents at nonce {}",
                hex::encode(hash),
                nonce
            )));
        }

        Ok(self.append_sealed(candidate, hash))
    }

    /// Mines all pending transactions into one block, running the search to
    /// completion.
    pub fn mine_pending_transactions(&mut self, miner: &PublicKey) -> Block {
        let mut candidate = self.prepare_candidate(miner);
        tracing::info!(
            index = candidate.block.index(),
            transactions = candidate.block.transactions.len(),
            difficulty = self.difficulty,
            "mining block"
        );
        let (hash, _nonce) = proof_of_work(&mut candidate.block, self.difficulty);
        self.append_sealed(candidate, hash)
    }

    /// Like [`Blockchain::mine_pending_transactions`] but stops when `cancel`
    /// is set, leaving the chain and the pool untouched.
    pub fn mine_cancellable(
        &mut self,
        miner: &PublicKey,
        cancel: &CancelFlag,
        check_interval: u64,
    ) -> Result<Block, ChainError> {
        let mut candidate = self.prepare_candidate(miner);
        let (hash, _nonce) =
            proof_of_work_cancellable(&mut candidate.block, self.difficulty, cancel, check_interval)
                .ok_or(ChainError::MiningCancelled)?;
        Ok(self.append_sealed(candidate, hash))
    }

    fn append_sealed(&mut self, candidate: Candidate, hash: Sha256Hash) -> Block {
        let Candidate {
            mut block,
            included,
            ..
        } = candidate;
        block.hash = hash;

        let removed = self.mempool.remove_ids(&included);
        tracing::info!(
            index = block.index(),
            hash = %block.hash_str(),
            nonce = block.header.nonce,
            confirmed = removed,
            "block mined"
        );

        self.blocks.push(block.clone());
        block
    }

    /// Confirmed balance of `key`, replayed from the whole chain.
    pub fn get_balance(&self, key: &PublicKey) -> Amount {
        balance_of(&self.blocks, key)
    }

    /// Confirmed balance of every key that appears on the chain.
    pub fn balances(&self) -> BTreeMap<PublicKey, Amount> {
        BalanceSheet::replay(&self.blocks).into_balances()
    }

    pub fn validate_chain(&self) -> Result<(), ChainError> {
        validate_blocks(&self.blocks, self.difficulty).map_err(ChainError::ChainIntegrity)
    }

    pub fn is_chain_valid(&self) -> bool {
        match validate_blocks(&self.blocks, self.difficulty) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!(%violation, "chain validation failed");
                false
            }
        }
    }

    /// First integrity violation, if any, without the error wrapper.
    pub fn find_violation(&self) -> Option<IntegrityViolation> {
        validate_blocks(&self.blocks, self.difficulty).err()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn tip(&self) -> &Block {
        // `blocks` always starts with genesis
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn height(&self) -> usize {
        self.blocks.len()
    }

    pub fn dump_chain(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn pending(&self) -> Vec<PendingEntry> {
        self.mempool.snapshot()
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mining_reward(&self) -> Amount {
        self.mining_reward
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}
