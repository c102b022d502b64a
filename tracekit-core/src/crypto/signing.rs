// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Ed25519 Digital Signatures
//!
//! Health authorities sign diagnosis keys before they are distributed; the
//! matcher only folds keys whose signature verifies against a trusted
//! authority key.

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair as RingKeyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// Signing error types.
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("System random number generator unavailable")]
    RngUnavailable,
    #[error("Invalid key material")]
    InvalidKey,
}

/// Ed25519 signing keypair held by a diagnosis authority.
///
/// Private key material is zeroed on drop.
pub struct SigningKeyPair {
    keypair: Ed25519KeyPair,
    seed: [u8; 32],
}

impl Drop for SigningKeyPair {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}

impl std::fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("public_key", &self.public_key().fingerprint())
            .finish()
    }
}

impl SigningKeyPair {
    /// Generates a new random Ed25519 keypair.
    pub fn generate() -> Result<Self, SigningError> {
        let rng = SystemRandom::new();
        let seed = ring::rand::generate::<[u8; 32]>(&rng)
            .map_err(|_| SigningError::RngUnavailable)?
            .expose();

        Self::from_seed(&seed)
    }

    /// Creates a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SigningError> {
        let keypair =
            Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| SigningError::InvalidKey)?;

        Ok(SigningKeyPair {
            keypair,
            seed: *seed,
        })
    }

    /// Returns the public key portion of this keypair.
    pub fn public_key(&self) -> PublicKey {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(self.keypair.public_key().as_ref());
        PublicKey { bytes }
    }

    /// Signs a message and returns the signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.keypair.sign(message);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(sig.as_ref());
        Signature { bytes }
    }
}

/// Ed25519 public key for verification.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "hex_array")]
    bytes: [u8; 32],
}

impl PublicKey {
    /// Creates a public key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey { bytes }
    }

    /// Parses a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, SigningError> {
        let raw = hex::decode(s).map_err(|_| SigningError::InvalidKey)?;
        let bytes: [u8; 32] = raw.try_into().map_err(|_| SigningError::InvalidKey)?;
        Ok(PublicKey { bytes })
    }

    /// Returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex fingerprint for display and configuration files.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Verifies a signature against a message using this public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        use ring::signature::{UnparsedPublicKey, ED25519};

        let public_key = UnparsedPublicKey::new(&ED25519, &self.bytes);
        public_key.verify(message, &signature.bytes).is_ok()
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(with = "hex_array")]
    bytes: [u8; 64],
}

impl Signature {
    /// Creates a signature from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Signature { bytes }
    }

    /// Returns the raw bytes of the signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }
}

mod hex_array {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = hex::decode(&s).map_err(D::Error::custom)?;
        raw.try_into()
            .map_err(|_| D::Error::custom(format!("expected {} bytes", N)))
    }
}
