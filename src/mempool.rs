//! Pending transaction pool.
//!
//! Every admitted transaction gets a [`PendingId`] from a per-pool counter.
//! Mining snapshots entries together with their ids and later removes exactly
//! those ids, so two structurally identical transfers are tracked and removed
//! independently, and anything admitted while a block was being mined stays
//! queued.

use crate::amount::Amount;
use crate::error::ChainError;
use crate::transaction::{Identity, Transaction};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_MAX_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingId(u64);

impl PendingId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    pub id: PendingId,
    pub transaction: Transaction,
}

#[derive(Debug, Clone)]
pub struct Mempool {
    entries: Vec<PendingEntry>,
    next_id: u64,
    max_size: usize,
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

impl Mempool {
    pub fn new() -> Self {
        Self::with_capacity_limit(DEFAULT_MAX_SIZE)
    }

    pub fn with_capacity_limit(max_size: usize) -> Self {
        Mempool {
            entries: Vec::new(),
            next_id: 0,
            max_size,
        }
    }

    /// Queues `tx` in arrival order. Callers are expected to have validated it.
    pub fn add(&mut self, tx: Transaction) -> Result<PendingId, ChainError> {
        if self.entries.len() >= self.max_size {
            return Err(ChainError::MempoolFull);
        }

        let id = PendingId(self.next_id);
        self.next_id += 1;
        self.entries.push(PendingEntry {
            id,
            transaction: tx,
        });
        Ok(id)
    }

    /// Total amount plus fee that queued transactions already debit from
    /// `sender`.
    pub fn pending_spend(&self, sender: &Identity) -> Amount {
        self.entries
            .iter()
            .filter(|entry| &entry.transaction.sender == sender)
            .map(|entry| entry.transaction.total_debit())
            .sum()
    }

    /// Total amount queued transactions will credit to `recipient`.
    pub fn pending_credit(&self, recipient: &PublicKey) -> Amount {
        self.entries
            .iter()
            .filter(|entry| &entry.transaction.recipient == recipient)
            .map(|entry| entry.transaction.amount)
            .sum()
    }

    pub fn snapshot(&self) -> Vec<PendingEntry> {
        self.entries.clone()
    }

    /// Drops the entries whose ids appear in `ids`, returning how many were
    /// removed. Unknown ids are ignored.
    pub fn remove_ids(&mut self, ids: &[PendingId]) -> usize {
        let ids: HashSet<PendingId> = ids.iter().copied().collect();
        let before = self.entries.len();
        self.entries.retain(|entry| !ids.contains(&entry.id));
        before - self.entries.len()
    }

    pub fn get(&self, id: PendingId) -> Option<&PendingEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
