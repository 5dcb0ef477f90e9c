//! powledger - A single-node proof-of-work value ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, Merkle commitment, balance replay and chain validation
//! - [`transaction`] - Transaction types, canonical payloads and signing
//! - [`mempool`] - Pending transaction pool
//! - [`amount`] - Fixed-precision amounts
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work search
//!
//! ## Cryptography
//! - [`crypto`] - Keys, signatures and verification (secp256k1)
//! - [`canonical`] - Canonical JSON encoding
//!
//! ## State Management
//! - [`wallet`] - Named wallet registry
//! - [`node`] - Shared ledger service with cancellable mining
//!
//! ## Integration
//! - [`api`] - REST API (feature `api`)
//! - [`cli`] - Demo and interactive shell (feature `cli`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod amount;
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod canonical;
pub mod crypto;

// ============================================================================
// State Management
// ============================================================================
pub mod node;
pub mod wallet;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "cli")]
pub mod cli;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
