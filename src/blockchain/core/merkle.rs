//! Pairwise Merkle commitment over a block's transactions.
//!
//! Leaves are transaction canonical hashes. Each level pairs neighbours left
//! to right and hashes the concatenation of their lowercase hex forms; an odd
//! level repeats its last hash. That padding means `[a, b, c]` and
//! `[a, b, c, c]` commit to the same root. The weakness is accepted: block
//! hashes still cover the root, and transaction lists are never reconstructed
//! from roots alone.

use crate::crypto::{sha256, Sha256Hash};
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

pub fn merkle_root(transactions: &[Transaction]) -> Sha256Hash {
    let leaves = transactions.iter().map(Transaction::canonical_hash).collect();
    merkle_root_from_hashes(leaves)
}

/// Reduces `level` to a single root. An empty list commits to `sha256("")`.
pub fn merkle_root_from_hashes(mut level: Vec<Sha256Hash>) -> Sha256Hash {
    if level.is_empty() {
        return sha256(b"");
    }

    while level.len() > 1 {
        if level.len() % 2 == 1 {
            let last = level[level.len() - 1];
            level.push(last);
        }
        level = level
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

fn hash_pair(left: &Sha256Hash, right: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(hex::encode(left));
    hasher.update(hex::encode(right));
    hasher.finalize().into()
}
