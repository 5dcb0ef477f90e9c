/// Transaction types for powledger
use crate::amount::Amount;
use crate::canonical::{now_millis, to_canonical_json};
use crate::crypto::{public_key_from_hex, sha256, KeyPair, Sha256Hash};
use crate::error::ChainError;
use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Textual form of the reserved issuance identity.
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Who a transaction debits: a real key, or the trusted issuance sentinel used
/// for faucet grants and mining rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    System,
    Key(PublicKey),
}

impl Identity {
    pub fn is_system(&self) -> bool {
        matches!(self, Identity::System)
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        match self {
            Identity::System => None,
            Identity::Key(key) => Some(key),
        }
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Identity::Key(key)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::System => f.write_str(SYSTEM_SENDER),
            Identity::Key(key) => write!(f, "{}", key),
        }
    }
}

impl FromStr for Identity {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SYSTEM_SENDER {
            Ok(Identity::System)
        } else {
            public_key_from_hex(s).map(Identity::Key)
        }
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A transfer of `amount` from `sender` to `recipient`, paying `fee` to
/// whoever mines it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Identity,
    pub recipient: PublicKey,
    pub amount: Amount,
    pub fee: Amount,
    /// Unix milliseconds
    pub timestamp: u64,
    #[serde(default, with = "signature_hex")]
    pub signature: Option<Vec<u8>>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<Identity>,
        recipient: PublicKey,
        amount: Amount,
        fee: Amount,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            recipient,
            amount,
            fee,
            timestamp: now_millis(),
            signature: None,
        }
    }

    /// Unsigned `SYSTEM` grant, used for faucets and mining rewards.
    pub fn issuance(recipient: PublicKey, amount: Amount) -> Self {
        Self::new(Identity::System, recipient, amount, Amount::ZERO)
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sorted-key JSON over every field except the signature.
    pub fn canonical_payload(&self) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("amount", Value::String(self.amount.to_string()));
        fields.insert("fee", Value::String(self.fee.to_string()));
        fields.insert("recipient", Value::String(self.recipient.to_string()));
        fields.insert("sender", Value::String(self.sender.to_string()));
        fields.insert("timestamp", Value::from(self.timestamp));
        to_canonical_json(fields)
    }

    pub fn canonical_hash(&self) -> Sha256Hash {
        sha256(self.canonical_payload().as_bytes())
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.canonical_hash())
    }

    /// Signs the hex canonical hash with `keypair`, which must own the sender
    /// key.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        let signer = keypair.public_key();
        if self.sender != Identity::Key(signer) {
            return Err(ChainError::IdentityMismatch {
                expected: self.sender.to_string(),
                actual: signer.to_string(),
            });
        }

        let signature = keypair.sign(self.hash_str().as_bytes())?;
        self.signature = Some(signature.to_vec());
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// What the sender's balance is debited by.
    pub fn total_debit(&self) -> Amount {
        self.amount + self.fee
    }
}

mod signature_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        signature: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match signature {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| hex::decode(s).map_err(de::Error::custom))
            .transpose()
    }
}
