//! Cryptographic primitives for powledger

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Raw SHA-256 digest.
pub type Sha256Hash = [u8; 32];

pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// SHA-256 rendered as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// A secp256k1 keypair. The secret scalar never leaves this type except
/// through [`KeyPair::export_secret_hex`].
#[derive(Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key.to_string())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    ///
    /// Rejects anything that is not exactly 32 bytes, the zero scalar, and
    /// scalars at or above the curve order.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(ChainError::MalformedKeyEncoding(format!(
                "Secret key must be {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            ChainError::MalformedKeyEncoding(format!("Secret key out of range: {}", e))
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Decodes a hex-encoded secret scalar.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| {
            ChainError::MalformedKeyEncoding(format!("Invalid secret key hex: {}", e))
        })?;
        Self::from_secret_bytes(&bytes)
    }

    /// Hex-encoded secret scalar. Callers must treat the result as secret.
    pub fn export_secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Compressed SEC1 public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        self.public_key.to_string()
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], ChainError> {
        let digest = Sha256::digest(message);

        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::InvalidSignature(format!("Failed to create message: {}", e)))?;

        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Parses a compressed or uncompressed SEC1 public key from hex.
pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKey, ChainError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| ChainError::MalformedKeyEncoding(format!("Invalid public key hex: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::MalformedKeyEncoding(format!("Invalid public key: {}", e)))
}

/// Verifies an ECDSA signature over `message` against `public_key`.
///
/// Pure predicate: wrong-length or unparsable signatures and failed
/// verification all yield `false`.
pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature_bytes: &[u8]) -> bool {
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return false;
    }
    let Ok(signature) = Signature::from_compact(signature_bytes) else {
        return false;
    };
    let digest = Sha256::digest(message);
    let Ok(message) = Message::from_digest_slice(&digest) else {
        return false;
    };

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, public_key)
        .is_ok()
}

/// Hex front end to [`verify_signature`]; malformed hex is simply `false`.
pub fn verify(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(public_key) = public_key_from_hex(public_key_hex) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    verify_signature(&public_key, message, &signature_bytes)
}
