// crates/trellis-core/src/crypto.rs
//
// Key material for own identities and identifier derivation.

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::TrellisError;

/// An ed25519 keypair backing an own identity's insert URI.
pub struct Keypair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl Keypair {
    /// Generate a new random ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Keypair {
            signing_key,
            verifying_key,
        }
    }

    /// Rebuild a keypair from 32 secret key bytes.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Keypair {
            signing_key,
            verifying_key,
        }
    }

    /// Get the public key bytes (32 bytes).
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Get the secret key bytes (32 bytes).
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// Check that 32 bytes form a valid ed25519 public key.
pub fn validate_public_key(bytes: &[u8; 32]) -> Result<(), TrellisError> {
    VerifyingKey::from_bytes(bytes)?;
    Ok(())
}

/// Compute SHA-256 hash of the given bytes.
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Decode a hex string that must hold exactly 32 bytes.
pub fn decode_key_hex(hex_str: &str) -> Result<[u8; 32], TrellisError> {
    let bytes = hex::decode(hex_str)?;
    bytes.try_into().map_err(|_| {
        TrellisError::InvalidParameter("key must be exactly 32 bytes".to_string())
    })
}
