//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::crypto::KeyPair;
    use crate::error::ChainError;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn signed_transfer(sender: &KeyPair, recipient: &KeyPair) -> Transaction {
        let mut tx = Transaction::new(
            sender.public_key(),
            recipient.public_key(),
            amt("30"),
            amt("0.5"),
        );
        tx.sign(sender).unwrap();
        tx
    }

    #[test]
    fn test_signed_transaction_is_valid() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = signed_transfer(&alice, &bob);

        assert!(tx.is_signed());
        assert!(tx.is_valid());
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_unsigned_transaction_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::new(alice.public_key(), bob.public_key(), amt("1"), Amount::ZERO);

        assert!(!tx.is_valid());
        assert_eq!(
            tx.verify(),
            Err(ChainError::InvalidSignature(
                "transaction not signed".to_string()
            ))
        );
    }

    #[test]
    fn test_signing_with_wrong_key_is_identity_mismatch() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut tx = Transaction::new(alice.public_key(), bob.public_key(), amt("1"), Amount::ZERO);

        let result = tx.sign(&bob);
        assert!(matches!(result, Err(ChainError::IdentityMismatch { .. })));
        assert!(tx.signature.is_none());
    }

    #[test]
    fn test_system_sender_cannot_be_signed() {
        let alice = KeyPair::generate();
        let mut tx = Transaction::issuance(alice.public_key(), amt("100"));
        assert!(matches!(
            tx.sign(&alice),
            Err(ChainError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn test_system_issuance_is_valid_without_signature() {
        let miner = KeyPair::generate();
        let tx = Transaction::issuance(miner.public_key(), amt("25"));
        assert!(tx.sender.is_system());
        assert!(tx.fee.is_zero());
        assert!(tx.is_valid());
    }

    #[test]
    fn test_tampered_amount_invalidates_signature() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut tx = signed_transfer(&alice, &bob);

        tx.amount = amt("3000");
        assert!(!tx.is_valid());
    }

    #[test]
    fn test_signature_from_other_transaction_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let first = signed_transfer(&alice, &bob);

        let mut second = Transaction::new(alice.public_key(), bob.public_key(), amt("31"), amt("0.5"))
            .with_timestamp(first.timestamp);
        second.signature = first.signature.clone();
        assert!(!second.is_valid());
    }

    #[test]
    fn test_canonical_hash_ignores_signature() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let signed = signed_transfer(&alice, &bob);
        let mut unsigned = signed.clone();
        unsigned.signature = None;

        assert_eq!(signed.canonical_hash(), unsigned.canonical_hash());
    }

    #[test]
    fn test_canonical_payload_layout() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::new(alice.public_key(), bob.public_key(), amt("30.50"), amt("0.5"))
            .with_timestamp(1_700_000_000_000);

        let expected = format!(
            r#"{{"amount":"30.5","fee":"0.5","recipient":"{}","sender":"{}","timestamp":1700000000000}}"#,
            bob.public_key_hex(),
            alice.public_key_hex()
        );
        assert_eq!(tx.canonical_payload(), expected);
    }

    #[test]
    fn test_system_payload_uses_sentinel() {
        let bob = KeyPair::generate();
        let tx = Transaction::issuance(bob.public_key(), amt("100")).with_timestamp(1);
        assert!(tx.canonical_payload().contains(r#""sender":"SYSTEM""#));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = Transaction::new(
            alice.public_key(),
            bob.public_key(),
            Amount::from_units(-1),
            Amount::ZERO,
        );
        assert!(matches!(
            tx.validate_structure(),
            Err(ChainError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_json_round_trip_preserves_validity() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let tx = signed_transfer(&alice, &bob);

        let json = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.is_valid());
    }

    #[test]
    fn test_identity_parsing() {
        let alice = KeyPair::generate();
        assert_eq!("SYSTEM".parse::<Identity>().unwrap(), Identity::System);
        assert_eq!(
            alice.public_key_hex().parse::<Identity>().unwrap(),
            Identity::Key(alice.public_key())
        );
        assert!(matches!(
            "alice".parse::<Identity>(),
            Err(ChainError::MalformedKeyEncoding(_))
        ));
    }
}
