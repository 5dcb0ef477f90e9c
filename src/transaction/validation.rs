/// Validation logic for transactions separated from type definitions
use crate::crypto::verify_signature;
use crate::error::ChainError;
use crate::transaction::types::{Identity, Transaction};

impl Transaction {
    /// Signature predicate used on admission and on every chain re-validation.
    ///
    /// `SYSTEM` issuance is trusted and always passes.
    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }

    /// Same check as [`Transaction::is_valid`], reporting why it failed.
    pub fn verify(&self) -> Result<(), ChainError> {
        let public_key = match &self.sender {
            Identity::System => return Ok(()),
            Identity::Key(key) => key,
        };

        let signature = self
            .signature
            .as_ref()
            .ok_or_else(|| ChainError::InvalidSignature("transaction not signed".to_string()))?;

        if verify_signature(public_key, self.hash_str().as_bytes(), signature) {
            Ok(())
        } else {
            Err(ChainError::InvalidSignature(
                "signature verification failed".to_string(),
            ))
        }
    }

    /// Stateless field checks performed before any signature or balance work.
    pub fn validate_structure(&self) -> Result<(), ChainError> {
        if self.amount.is_negative() {
            return Err(ChainError::InvalidTransaction(
                "Transfer amount cannot be negative".to_string(),
            ));
        }
        if self.fee.is_negative() {
            return Err(ChainError::InvalidTransaction(
                "Fee cannot be negative".to_string(),
            ));
        }
        if self.amount.checked_add(self.fee).is_none() {
            return Err(ChainError::InvalidTransaction(
                "Amount plus fee overflows".to_string(),
            ));
        }
        Ok(())
    }
}
