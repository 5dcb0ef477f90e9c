//! Property tests for signatures, amounts and Merkle commitments.

use powledger::amount::Amount;
use powledger::blockchain::merkle_root_from_hashes;
use powledger::crypto::{sha256, verify_signature, KeyPair};
use powledger::transaction::Transaction;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_signature_verifies_for_signer(message in prop::collection::vec(any::<u8>(), 0..256)) {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(&message).expect("signing succeeds");
        prop_assert!(verify_signature(&keypair.public_key(), &message, &signature));

        let other = KeyPair::generate();
        prop_assert!(!verify_signature(&other.public_key(), &message, &signature));
    }

    #[test]
    fn prop_flipped_bit_breaks_signature(
        message in prop::collection::vec(any::<u8>(), 1..128),
        sig_bit in 0usize..512,
        msg_bit in any::<prop::sample::Index>(),
    ) {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(&message).expect("signing succeeds");

        let mut tampered_sig = signature;
        tampered_sig[sig_bit / 8] ^= 1 << (sig_bit % 8);
        prop_assert!(!verify_signature(&keypair.public_key(), &message, &tampered_sig));

        let mut tampered_msg = message.clone();
        let bit = msg_bit.index(tampered_msg.len() * 8);
        tampered_msg[bit / 8] ^= 1 << (bit % 8);
        prop_assert!(!verify_signature(&keypair.public_key(), &tampered_msg, &signature));
    }

    #[test]
    fn prop_canonical_hash_ignores_signature(
        units in 0i64..1_000_000_000_000,
        fee_units in 0i64..1_000_000,
        timestamp in 0u64..4_000_000_000_000,
    ) {
        let sender = KeyPair::generate();
        let recipient = KeyPair::generate().public_key();
        let mut tx = Transaction::new(
            sender.public_key(),
            recipient,
            Amount::from_units(units),
            Amount::from_units(fee_units),
        )
        .with_timestamp(timestamp);

        let before = tx.canonical_hash();
        tx.sign(&sender).expect("sender owns the key");
        prop_assert_eq!(before, tx.canonical_hash());
        prop_assert!(tx.is_valid());

        tx.timestamp += 1;
        prop_assert!(!tx.is_valid());
    }

    #[test]
    fn prop_amount_text_is_canonical(units in 0i64..i64::MAX) {
        let amount = Amount::from_units(units);
        let text = amount.to_string();
        prop_assert_eq!(text.parse::<Amount>().expect("display output parses"), amount);
        prop_assert!(!text.contains('.') || !text.ends_with('0'));

        // Padding the fraction to full precision names the same amount
        let padded = format!("{}.{:08}", units / 100_000_000, units % 100_000_000);
        prop_assert_eq!(padded.parse::<Amount>().expect("padded text parses"), amount);
    }

    #[test]
    fn prop_merkle_root_is_deterministic(seeds in prop::collection::vec(any::<u64>(), 1..20)) {
        let leaves: Vec<_> = seeds.iter().map(|s| sha256(&s.to_le_bytes())).collect();
        let root = merkle_root_from_hashes(leaves.clone());
        prop_assert_eq!(root, merkle_root_from_hashes(leaves.clone()));

        if leaves.len() >= 3 && leaves.len() % 2 == 1 {
            let mut padded = leaves.clone();
            padded.push(leaves[leaves.len() - 1]);
            prop_assert_eq!(root, merkle_root_from_hashes(padded));
        }

        let mut extended = leaves;
        extended.push(sha256(b"extra"));
        extended.push(sha256(b"extra-2"));
        prop_assert_ne!(root, merkle_root_from_hashes(extended));
    }
}
