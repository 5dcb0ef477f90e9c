//! Error types for powledger

use crate::amount::{Amount, AmountError};
use crate::blockchain::IntegrityViolation;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    IdentityMismatch { expected: String, actual: String },
    InvalidSignature(String),
    InsufficientFunds { required: Amount, available: Amount },
    MalformedKeyEncoding(String),
    ChainIntegrity(IntegrityViolation),
    InvalidBlock(String),
    InvalidAmount(String),
    InvalidTransaction(String),
    MempoolFull,
    MiningCancelled,
    MiningAlreadyRunning,
    StaleCandidate,
    WalletError(String),
    WalletNotFound(String),
    ConfigError(String),
    IoError(String),
    SerializationError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::IdentityMismatch { expected, actual } => write!(
                f,
                "Identity mismatch: transaction sender is {} but signing key is {}",
                expected, actual
            ),
            ChainError::InvalidSignature(msg) => write!(f, "Invalid signature: {}", msg),
            ChainError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "Insufficient funds: required {}, available {}",
                required, available
            ),
            ChainError::MalformedKeyEncoding(msg) => write!(f, "Malformed key encoding: {}", msg),
            ChainError::ChainIntegrity(violation) => {
                write!(f, "Chain integrity error: {}", violation)
            }
            ChainError::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            ChainError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            ChainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::MempoolFull => write!(f, "Mempool is full"),
            ChainError::MiningCancelled => write!(f, "Mining was cancelled"),
            ChainError::MiningAlreadyRunning => write!(f, "Mining is already running"),
            ChainError::StaleCandidate => {
                write!(f, "Candidate block no longer extends the chain tip")
            }
            ChainError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            ChainError::WalletNotFound(label) => write!(f, "Wallet not found: {}", label),
            ChainError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<AmountError> for ChainError {
    fn from(err: AmountError) -> Self {
        ChainError::InvalidAmount(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
