use crate::miner::meets_difficulty;
use serde::Serialize;
use std::fmt;

use super::chain::Block;
use super::merkle::merkle_root;
use super::state::BalanceSheet;

/// What was wrong with the block named in an [`IntegrityViolation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum IntegrityKind {
    GenesisMismatch,
    IndexDiscontinuity { expected: u64, found: u64 },
    BrokenLink,
    MerkleRootMismatch,
    HashMismatch,
    InsufficientWork { difficulty: u32 },
    InvalidTransaction(String),
    /// Replaying the transaction takes a balance outside the `Amount` range.
    BalanceOverflow,
}

/// First integrity failure found by a chain walk. `block_index` is the
/// block's position in the chain; `transaction` is set when a single
/// transaction inside it is to blame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub block_index: usize,
    pub kind: IntegrityKind,
    pub transaction: Option<usize>,
}

impl IntegrityViolation {
    fn block(block_index: usize, kind: IntegrityKind) -> Self {
        IntegrityViolation {
            block_index,
            kind,
            transaction: None,
        }
    }
}

impl fmt::Display for IntegrityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityKind::GenesisMismatch => write!(f, "genesis block does not match"),
            IntegrityKind::IndexDiscontinuity { expected, found } => {
                write!(f, "expected index {}, found {}", expected, found)
            }
            IntegrityKind::BrokenLink => write!(f, "previous_hash does not match prior block"),
            IntegrityKind::MerkleRootMismatch => {
                write!(f, "merkle root does not match transactions")
            }
            IntegrityKind::HashMismatch => write!(f, "stored hash does not match contents"),
            IntegrityKind::InsufficientWork { difficulty } => {
                write!(f, "hash does not meet difficulty {}", difficulty)
            }
            IntegrityKind::InvalidTransaction(reason) => write!(f, "{}", reason),
            IntegrityKind::BalanceOverflow => write!(f, "balance overflows on replay"),
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transaction {
            Some(tx) => write!(f, "block {} transaction {}: {}", self.block_index, tx, self.kind),
            None => write!(f, "block {}: {}", self.block_index, self.kind),
        }
    }
}

/// Walks `blocks` from genesis and reports the first violation.
///
/// Checks per non-genesis block, in order: index continuity, linkage to the
/// previous block, stored Merkle root, stored hash, proof of work at
/// `difficulty`, then every transaction signature. Balances are replayed
/// alongside and must stay within the `Amount` range.
pub fn validate_blocks(blocks: &[Block], difficulty: u32) -> Result<(), IntegrityViolation> {
    match blocks.first() {
        Some(genesis) if *genesis == Block::genesis() => {}
        _ => return Err(IntegrityViolation::block(0, IntegrityKind::GenesisMismatch)),
    }

    let mut balances = BalanceSheet::new();
    for (position, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let block_index = position + 1;

        let expected = previous.header.index + 1;
        if current.header.index != expected {
            return Err(IntegrityViolation::block(
                block_index,
                IntegrityKind::IndexDiscontinuity {
                    expected,
                    found: current.header.index,
                },
            ));
        }
        if current.header.previous_hash != previous.hash {
            return Err(IntegrityViolation::block(block_index, IntegrityKind::BrokenLink));
        }
        if current.header.merkle_root != merkle_root(&current.transactions) {
            return Err(IntegrityViolation::block(
                block_index,
                IntegrityKind::MerkleRootMismatch,
            ));
        }
        if current.hash != current.compute_hash() {
            return Err(IntegrityViolation::block(block_index, IntegrityKind::HashMismatch));
        }
        if !meets_difficulty(&current.hash, difficulty) {
            return Err(IntegrityViolation::block(
                block_index,
                IntegrityKind::InsufficientWork { difficulty },
            ));
        }

        for (tx_index, tx) in current.transactions.iter().enumerate() {
            if let Err(e) = tx.verify() {
                return Err(IntegrityViolation {
                    block_index,
                    kind: IntegrityKind::InvalidTransaction(e.to_string()),
                    transaction: Some(tx_index),
                });
            }
            if !balances.try_apply_transaction(tx) {
                return Err(IntegrityViolation {
                    block_index,
                    kind: IntegrityKind::BalanceOverflow,
                    transaction: Some(tx_index),
                });
            }
        }
    }

    Ok(())
}
