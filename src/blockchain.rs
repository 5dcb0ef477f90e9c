// Thin re-export module: implementation lives under `blockchain/core/` split
// by responsibility (block and ledger, Merkle commitment, balance replay,
// integrity validation).

pub mod core;
pub use self::core::*;
