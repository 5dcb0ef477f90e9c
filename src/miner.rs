//! Proof-of-work search.
//!
//! A hash meets difficulty `d` when its lowercase hex form starts with `d`
//! `'0'` digits. The search walks nonces upward from zero, so the nonce found is
//! always the smallest one that satisfies the target.

use crate::blockchain::{merkle_root, Block};
use crate::crypto::Sha256Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A SHA-256 digest has 64 hex digits; anything above this can never be met.
pub const MAX_DIFFICULTY: u32 = 64;

/// How many nonces a cancellable search tries between flag checks.
pub const DEFAULT_CHECK_INTERVAL: u64 = 10_000;

/// Shared stop signal for a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub fn leading_zero_digits(hash: &Sha256Hash) -> u32 {
    let mut digits = 0;
    for byte in hash {
        if *byte == 0 {
            digits += 2;
            continue;
        }
        if byte >> 4 == 0 {
            digits += 1;
        }
        break;
    }
    digits
}

pub fn meets_difficulty(hash: &Sha256Hash, difficulty: u32) -> bool {
    leading_zero_digits(hash) >= difficulty
}

/// Finds the smallest nonce whose block hash meets `difficulty`.
///
/// The Merkle root is computed once up front and stored in the header; the
/// header nonce is used as the search counter and holds the winning nonce on
/// return.
pub fn proof_of_work(block: &mut Block, difficulty: u32) -> (Sha256Hash, u64) {
    block.header.merkle_root = merkle_root(&block.transactions);
    block.header.nonce = 0;

    loop {
        let hash = block.header.hash();
        if meets_difficulty(&hash, difficulty) {
            return (hash, block.header.nonce);
        }
        block.header.nonce += 1;
    }
}

/// Like [`proof_of_work`], but polls `cancel` every `check_interval` nonces
/// (including before the first attempt) and returns `None` once it is set.
pub fn proof_of_work_cancellable(
    block: &mut Block,
    difficulty: u32,
    cancel: &CancelFlag,
    check_interval: u64,
) -> Option<(Sha256Hash, u64)> {
    let interval = check_interval.max(1);
    block.header.merkle_root = merkle_root(&block.transactions);
    block.header.nonce = 0;

    loop {
        if block.header.nonce % interval == 0 && cancel.is_cancelled() {
            tracing::debug!(
                index = block.header.index,
                nonce = block.header.nonce,
                "proof-of-work search cancelled"
            );
            return None;
        }

        let hash = block.header.hash();
        if meets_difficulty(&hash, difficulty) {
            return Some((hash, block.header.nonce));
        }
        block.header.nonce += 1;
    }
}

/// Runs the search and seals `block` with the winning nonce and hash.
pub fn mine_block(mut block: Block, difficulty: u32) -> Block {
    let (hash, nonce) = proof_of_work(&mut block, difficulty);
    block.header.nonce = nonce;
    block.hash = hash;
    block
}
