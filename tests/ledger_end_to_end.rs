//! Integration tests for the ledger lifecycle: admission, mining, balances and
//! integrity checks through the public API only.

use powledger::amount::Amount;
use powledger::blockchain::{merkle_root, Blockchain};
use powledger::crypto::KeyPair;
use powledger::error::ChainError;
use powledger::miner::{leading_zero_digits, meets_difficulty, CancelFlag};
use powledger::transaction::Transaction;
use secp256k1::PublicKey;

fn amount(s: &str) -> Amount {
    s.parse().expect("valid amount literal")
}

fn transfer(
    from: &KeyPair,
    to: &PublicKey,
    value: &str,
    fee: &str,
) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new(from.public_key(), *to, amount(value), amount(fee));
    tx.sign(from)?;
    Ok(tx)
}

#[test]
fn test_faucet_transfer_and_mining_flow() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(2, amount("25"));
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    let m = KeyPair::generate();

    assert_eq!(chain.height(), 1);

    assert!(chain.add_transaction(Transaction::issuance(a.public_key(), amount("100"))));
    chain.mine_pending_transactions(&m.public_key());
    assert_eq!(chain.height(), 2);
    assert_eq!(chain.get_balance(&a.public_key()), amount("100"));
    assert_eq!(chain.get_balance(&m.public_key()), amount("25"));

    assert!(chain.add_transaction(transfer(&a, &b.public_key(), "30", "0.5")?));
    assert!(!chain.add_transaction(transfer(&a, &b.public_key(), "1000", "0")?));
    assert_eq!(chain.pending().len(), 1);

    chain.mine_pending_transactions(&m.public_key());
    assert_eq!(chain.height(), 3);
    assert_eq!(chain.get_balance(&a.public_key()).to_string(), "69.5");
    assert_eq!(chain.get_balance(&b.public_key()).to_string(), "30");
    assert_eq!(chain.get_balance(&m.public_key()).to_string(), "50.5");
    assert!(chain.is_chain_valid());
    assert!(chain.pending().is_empty());

    Ok(())
}

#[test]
fn test_admission_boundary_is_inclusive() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("1"));
    let a = KeyPair::generate();
    let b = KeyPair::generate().public_key();
    chain.submit(Transaction::issuance(a.public_key(), amount("10")))?;
    chain.mine_pending_transactions(&b);

    let err = chain
        .submit(transfer(&a, &b, "9.5", "0.50000001")?)
        .unwrap_err();
    assert_eq!(
        err,
        ChainError::InsufficientFunds {
            required: amount("10.00000001"),
            available: amount("10"),
        }
    );

    chain.submit(transfer(&a, &b, "9.5", "0.5")?)?;
    Ok(())
}

#[test]
fn test_pending_transfers_reduce_available_balance() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("1"));
    let a = KeyPair::generate();
    let b = KeyPair::generate().public_key();
    chain.submit(Transaction::issuance(a.public_key(), amount("10")))?;
    chain.mine_pending_transactions(&b);

    chain.submit(transfer(&a, &b, "6", "0")?)?;
    assert!(matches!(
        chain.submit(transfer(&a, &b, "5", "0")?),
        Err(ChainError::InsufficientFunds { .. })
    ));
    // Pending debits do not touch the confirmed balance
    assert_eq!(chain.get_balance(&a.public_key()), amount("10"));
    Ok(())
}

#[test]
fn test_reward_is_last_and_collects_fees() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("25"));
    let a = KeyPair::generate();
    let b = KeyPair::generate().public_key();
    let m = KeyPair::generate().public_key();
    chain.submit(Transaction::issuance(a.public_key(), amount("100")))?;
    chain.mine_pending_transactions(&m);

    chain.submit(transfer(&a, &b, "1", "0.25")?)?;
    chain.submit(transfer(&a, &b, "2", "0.75")?)?;
    let block = chain.mine_pending_transactions(&m);

    assert_eq!(block.transactions.len(), 3);
    let reward = block.transactions.last().ok_or("empty block")?;
    assert!(reward.sender.is_system());
    assert_eq!(reward.recipient, m);
    assert_eq!(reward.amount, amount("26"));
    assert_eq!(reward.fee, Amount::ZERO);
    Ok(())
}

#[test]
fn test_mined_nonce_is_smallest_satisfying() {
    let mut chain = Blockchain::new(2, amount("5"));
    let m = KeyPair::generate().public_key();
    let block = chain.mine_pending_transactions(&m);

    assert!(leading_zero_digits(&block.hash) >= 2);
    assert!(block.hash_str().starts_with("00"));
    assert_eq!(block.hash, block.compute_hash());
    assert_eq!(block.header.merkle_root, merkle_root(&block.transactions));

    let mut probe = block.clone();
    for nonce in 0..block.header.nonce {
        probe.header.nonce = nonce;
        assert!(!meets_difficulty(&probe.compute_hash(), 2));
    }
}

#[test]
fn test_identical_pending_transactions_are_each_mined_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("1"));
    let m = KeyPair::generate().public_key();
    let grant = Transaction::issuance(m, amount("3")).with_timestamp(1_700_000_000_000);

    let first = chain.submit(grant.clone())?;
    let second = chain.submit(grant)?;
    assert_ne!(first, second);

    let block = chain.mine_pending_transactions(&m);
    assert_eq!(block.transactions.len(), 3);
    assert!(chain.pending().is_empty());
    assert_eq!(chain.get_balance(&m), amount("7"));
    Ok(())
}

#[test]
fn test_cancelled_mining_commits_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(3, amount("1"));
    let m = KeyPair::generate().public_key();
    chain.submit(Transaction::issuance(m, amount("1")))?;

    let cancel = CancelFlag::new();
    cancel.cancel();
    assert_eq!(
        chain.mine_cancellable(&m, &cancel, 1).unwrap_err(),
        ChainError::MiningCancelled
    );
    assert_eq!(chain.height(), 1);
    assert_eq!(chain.pending().len(), 1);

    cancel.reset();
    let block = chain.mine_cancellable(&m, &cancel, 1_000)?;
    assert_eq!(block.index(), 1);
    assert!(chain.pending().is_empty());
    Ok(())
}

#[test]
fn test_stale_candidate_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("1"));
    let m = KeyPair::generate().public_key();

    let mut candidate = chain.prepare_candidate(&m);
    let (hash, nonce) = powledger::miner::proof_of_work(&mut candidate.block, 1);
    chain.mine_pending_transactions(&m);

    assert_eq!(
        chain.commit_candidate(candidate, hash, nonce),
        Err(ChainError::StaleCandidate)
    );
    assert_eq!(chain.height(), 2);
    Ok(())
}

#[test]
fn test_dump_chain_is_a_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(1, amount("1"));
    let m = KeyPair::generate().public_key();
    let dump = chain.dump_chain();
    chain.mine_pending_transactions(&m);

    assert_eq!(dump.len(), 1);
    assert_eq!(chain.dump_chain().len(), 2);

    let json = serde_json::to_value(chain.dump_chain())?;
    assert_eq!(json[0]["header"]["previous_hash"], "0".repeat(64));
    assert_eq!(json[1]["transactions"][0]["sender"], "SYSTEM");
    Ok(())
}

#[test]
fn test_genesis_is_shared_and_fixed() {
    let a = Blockchain::new(1, amount("1"));
    let b = Blockchain::new(3, amount("9"));
    assert_eq!(a.blocks()[0], b.blocks()[0]);
    assert_eq!(a.blocks()[0].header.timestamp, 1672531200000);
    assert!(a.validate_chain().is_ok());
}

#[test]
fn test_grants_cannot_push_a_balance_past_the_amount_range() -> Result<(), Box<dyn std::error::Error>> {
    let mut chain = Blockchain::new(0, amount("1"));
    let a = KeyPair::generate().public_key();
    let m = KeyPair::generate().public_key();
    let grant = amount("60000000000");

    assert!(chain.add_transaction(Transaction::issuance(a, grant)));
    assert!(!chain.add_transaction(Transaction::issuance(a, grant)));
    chain.mine_pending_transactions(&m);

    assert_eq!(chain.get_balance(&a), grant);
    assert!(chain.is_chain_valid());
    Ok(())
}
