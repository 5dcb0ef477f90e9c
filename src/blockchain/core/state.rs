use crate::amount::Amount;
use crate::transaction::{Identity, Transaction};
use secp256k1::PublicKey;
use std::collections::BTreeMap;

use super::chain::Block;

/// Account balances derived by replaying confirmed transactions. Nothing is
/// cached between queries; the chain is the only source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSheet {
    balances: BTreeMap<PublicKey, Amount>,
}

impl BalanceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replay(blocks: &[Block]) -> Self {
        let mut sheet = Self::new();
        for tx in blocks.iter().flat_map(|block| &block.transactions) {
            sheet.apply_transaction(tx);
        }
        sheet
    }

    /// Debits `amount + fee` from a keyed sender and credits `amount` to the
    /// recipient. `SYSTEM` is never debited. The fee reappears in the block's
    /// reward transaction.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        if let Identity::Key(sender) = tx.sender {
            *self.balances.entry(sender).or_insert(Amount::ZERO) -= tx.total_debit();
        }
        *self.balances.entry(tx.recipient).or_insert(Amount::ZERO) += tx.amount;
    }

    /// Like [`BalanceSheet::apply_transaction`] but leaves the sheet
    /// unchanged and returns `false` when a balance would leave the `Amount`
    /// range.
    pub fn try_apply_transaction(&mut self, tx: &Transaction) -> bool {
        let mut debited = None;
        if let Identity::Key(sender) = tx.sender {
            match self.get_balance(&sender).checked_sub(tx.total_debit()) {
                Some(balance) => debited = Some((sender, balance)),
                None => return false,
            }
        }

        let recipient_before = match debited {
            Some((sender, balance)) if sender == tx.recipient => balance,
            _ => self.get_balance(&tx.recipient),
        };
        let Some(credited) = recipient_before.checked_add(tx.amount) else {
            return false;
        };

        if let Some((sender, balance)) = debited {
            self.balances.insert(sender, balance);
        }
        self.balances.insert(tx.recipient, credited);
        true
    }

    pub fn get_balance(&self, key: &PublicKey) -> Amount {
        self.balances.get(key).copied().unwrap_or(Amount::ZERO)
    }

    pub fn into_balances(self) -> BTreeMap<PublicKey, Amount> {
        self.balances
    }
}

/// Balance of a single key without building the whole sheet.
pub fn balance_of(blocks: &[Block], key: &PublicKey) -> Amount {
    let mut balance = Amount::ZERO;
    for tx in blocks.iter().flat_map(|block| &block.transactions) {
        if tx.sender.public_key() == Some(key) {
            balance -= tx.total_debit();
        }
        if &tx.recipient == key {
            balance += tx.amount;
        }
    }
    balance
}
