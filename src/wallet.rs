//! Named wallet registry
//!
//! Thread-safe, label-keyed store of keypairs for the shell and the HTTP API.
//! Labels are case-preserved for display but looked up case-insensitively, and
//! an unknown label is always reported as [`ChainError::WalletNotFound`].

use crate::crypto::{public_key_from_hex, KeyPair};
use crate::error::ChainError;
use parking_lot::RwLock;
use secp256k1::PublicKey;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

const MAX_LABEL_LENGTH: usize = 64;
const MAX_WALLETS: usize = 10_000;

/// A labelled keypair. Serializes without the secret.
#[derive(Debug, Clone, Serialize)]
pub struct Wallet {
    /// Display label (case-preserved)
    pub label: String,

    #[serde(skip)]
    pub keypair: KeyPair,

    #[serde(rename = "public_key", serialize_with = "serialize_public_key")]
    public_key: PublicKey,

    /// RFC3339 timestamp when the wallet was registered
    pub created_at: String,
}

fn serialize_public_key<S: serde::Serializer>(key: &PublicKey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

impl Wallet {
    fn new(label: String, keypair: KeyPair) -> Self {
        Wallet {
            label,
            public_key: keypair.public_key(),
            keypair,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn export_secret_hex(&self) -> String {
        self.keypair.export_secret_hex()
    }
}

/// Shared registry handle; clones see the same wallets.
#[derive(Debug, Clone, Default)]
pub struct WalletRegistry {
    inner: Arc<RwLock<HashMap<String, Wallet>>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with freshly generated wallets for `labels`.
    pub fn with_wallets<'a>(labels: impl IntoIterator<Item = &'a str>) -> Result<Self, ChainError> {
        let registry = Self::new();
        for label in labels {
            registry.create(label)?;
        }
        Ok(registry)
    }

    /// Generates a new keypair under `label`.
    pub fn create(&self, label: &str) -> Result<Wallet, ChainError> {
        self.insert(label, KeyPair::generate())
    }

    /// Registers an existing keypair, e.g. one imported from a secret hex.
    pub fn insert(&self, label: &str, keypair: KeyPair) -> Result<Wallet, ChainError> {
        let label = label.trim();
        validate_label(label)?;
        let key = label.to_lowercase();

        let mut inner = self.inner.write();
        if inner.len() >= MAX_WALLETS {
            return Err(ChainError::WalletError(format!(
                "Wallet registry is full (max {} wallets)",
                MAX_WALLETS
            )));
        }
        if let Some(existing) = inner.get(&key) {
            return Err(ChainError::WalletError(format!(
                "Label '{}' already exists",
                existing.label
            )));
        }

        let wallet = Wallet::new(label.to_string(), keypair);
        inner.insert(key, wallet.clone());
        tracing::debug!(label = %wallet.label, public_key = %wallet.public_key, "wallet registered");
        Ok(wallet)
    }

    pub fn get(&self, label: &str) -> Result<Wallet, ChainError> {
        let inner = self.inner.read();
        inner
            .get(&label.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| ChainError::WalletNotFound(label.trim().to_string()))
    }

    pub fn remove(&self, label: &str) -> Result<Wallet, ChainError> {
        let mut inner = self.inner.write();
        inner
            .remove(&label.trim().to_lowercase())
            .ok_or_else(|| ChainError::WalletNotFound(label.trim().to_string()))
    }

    /// All wallets sorted by label
    pub fn list(&self) -> Vec<Wallet> {
        let inner = self.inner.read();
        let mut wallets: Vec<_> = inner.values().cloned().collect();
        wallets.sort_by_key(|w| w.label.to_lowercase());
        wallets
    }

    /// Resolves a wallet label, falling back to a compressed public key hex.
    pub fn resolve(&self, label_or_hex: &str) -> Result<PublicKey, ChainError> {
        if let Ok(wallet) = self.get(label_or_hex) {
            return Ok(wallet.public_key());
        }
        public_key_from_hex(label_or_hex.trim())
            .map_err(|_| ChainError::WalletNotFound(label_or_hex.trim().to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.inner.read().contains_key(&label.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_label(label: &str) -> Result<(), ChainError> {
    if label.is_empty() {
        return Err(ChainError::WalletError("Label cannot be empty".to_string()));
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(ChainError::WalletError(format!(
            "Label too long (max {} characters)",
            MAX_LABEL_LENGTH
        )));
    }

    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ChainError::WalletError(
            "Label contains invalid characters".to_string(),
        ));
    }

    Ok(())
}
