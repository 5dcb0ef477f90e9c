//! Integration tests for the wallet registry and signing with stored keys

use powledger::amount::Amount;
use powledger::blockchain::Blockchain;
use powledger::crypto::KeyPair;
use powledger::error::ChainError;
use powledger::transaction::Transaction;
use powledger::wallet::WalletRegistry;

#[test]
fn test_wallet_creation() -> Result<(), Box<dyn std::error::Error>> {
    let registry = WalletRegistry::new();
    let wallet = registry.create("test_wallet")?;

    assert_eq!(wallet.label, "test_wallet");
    assert!(!wallet.created_at.is_empty());

    // Compressed SEC1 public key: 33 bytes of lowercase hex
    let public_hex = wallet.public_key_hex();
    assert_eq!(public_hex.len(), 66);
    assert!(public_hex.starts_with("02") || public_hex.starts_with("03"));
    assert!(public_hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    assert_eq!(wallet.export_secret_hex().len(), 64);
    Ok(())
}

#[test]
fn test_create_two_wallets() -> Result<(), Box<dyn std::error::Error>> {
    let registry = WalletRegistry::new();
    let alice = registry.create("alice")?;
    let bob = registry.create("bob")?;

    assert_ne!(alice.public_key(), bob.public_key());
    assert_ne!(alice.export_secret_hex(), bob.export_secret_hex());
    assert_eq!(registry.len(), 2);
    Ok(())
}

#[test]
fn test_export_import_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let source = WalletRegistry::new();
    let original = source.create("alice")?;

    let target = WalletRegistry::new();
    let restored = target.insert(
        "Alice-Restored",
        KeyPair::from_secret_hex(&original.export_secret_hex())?,
    )?;

    assert_eq!(restored.public_key(), original.public_key());
    assert_eq!(target.resolve("alice-restored")?, original.public_key());
    Ok(())
}

#[test]
fn test_import_rejects_bad_secrets() {
    let registry = WalletRegistry::new();
    let zero = "0".repeat(64);
    let short = "ab".repeat(31);
    for secret in ["", "xyz", zero.as_str(), short.as_str()] {
        assert!(matches!(
            KeyPair::from_secret_hex(secret),
            Err(ChainError::MalformedKeyEncoding(_))
        ));
    }
    assert!(registry.is_empty());
}

#[test]
fn test_missing_wallet_is_reported() {
    let registry = WalletRegistry::with_wallets(["alice"]).unwrap();
    assert_eq!(
        registry.get("bob").unwrap_err(),
        ChainError::WalletNotFound("bob".to_string())
    );
    assert!(registry.contains("ALICE"));
    assert!(registry.remove("alice").is_ok());
    assert!(!registry.contains("alice"));
}

#[test]
fn test_registry_keys_sign_admitted_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let registry = WalletRegistry::with_wallets(["alice", "bob", "miner"])?;
    let alice = registry.get("alice")?;
    let bob = registry.resolve("bob")?;
    let miner = registry.resolve("miner")?;

    let mut chain = Blockchain::new(1, Amount::from_coins(10));
    chain.submit(Transaction::issuance(alice.public_key(), Amount::from_coins(50)))?;
    chain.mine_pending_transactions(&miner);

    let mut tx = Transaction::new(alice.public_key(), bob, Amount::from_coins(20), Amount::ZERO);
    tx.sign(&alice.keypair)?;
    chain.submit(tx)?;
    chain.mine_pending_transactions(&miner);

    assert_eq!(chain.get_balance(&alice.public_key()), Amount::from_coins(30));
    assert_eq!(chain.get_balance(&bob), Amount::from_coins(20));
    Ok(())
}

#[test]
fn test_signing_with_another_wallet_is_identity_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let registry = WalletRegistry::with_wallets(["alice", "mallory"])?;
    let alice = registry.get("alice")?;
    let mallory = registry.get("mallory")?;

    let mut tx = Transaction::new(
        alice.public_key(),
        mallory.public_key(),
        Amount::from_coins(1),
        Amount::ZERO,
    );
    assert!(matches!(
        tx.sign(&mallory.keypair),
        Err(ChainError::IdentityMismatch { .. })
    ));
    assert!(!tx.is_signed());
    Ok(())
}
