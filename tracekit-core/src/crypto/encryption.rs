// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Symmetric Encryption (XChaCha20-Poly1305)
//!
//! Authenticated encryption for secrets kept at rest, most importantly the
//! device's own daily tracing keys.
//!
//! Ciphertext format: `0x02 || nonce (24 bytes) || ciphertext || tag (16 bytes)`.
//! The leading byte names the algorithm; only XChaCha20-Poly1305 (`0x02`) is
//! accepted.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;
use zeroize::Zeroize;

/// Encryption error types.
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: data may be corrupted or wrong key")]
    DecryptionFailed,
    #[error("Ciphertext too short")]
    CiphertextTooShort,
    #[error("Unsupported algorithm tag: {0:#04x}")]
    UnsupportedAlgorithm(u8),
    #[error("System random number generator unavailable")]
    RngUnavailable,
}

/// Algorithm tag for XChaCha20-Poly1305.
const ALG_TAG_XCHACHA20: u8 = 0x02;

/// Nonce size for XChaCha20-Poly1305 (192 bits = 24 bytes).
const XCHACHA20_NONCE_SIZE: usize = 24;
/// Authentication tag size.
const TAG_SIZE: usize = 16;

/// 256-bit key, zeroed on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SymmetricKey {
    /// Generates a new random symmetric key.
    pub fn generate() -> Result<Self, EncryptionError> {
        let rng = SystemRandom::new();
        let key = ring::rand::generate::<[u8; 32]>(&rng)
            .map_err(|_| EncryptionError::RngUnavailable)?
            .expose();
        Ok(SymmetricKey { bytes: key })
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        SymmetricKey { bytes }
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

fn cipher(key: &SymmetricKey) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(key.as_bytes().into())
}

fn random_nonce() -> Result<[u8; XCHACHA20_NONCE_SIZE], EncryptionError> {
    let mut nonce = [0u8; XCHACHA20_NONCE_SIZE];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| EncryptionError::RngUnavailable)?;
    Ok(nonce)
}

/// Encrypts `plaintext` with no associated data.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    encrypt_with_context(key, plaintext, &[])
}

/// Decrypts data produced by [`encrypt`].
pub fn decrypt(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    decrypt_with_context(key, ciphertext, &[])
}

/// Encrypts `plaintext`, authenticating `context` alongside it.
///
/// The same `context` must be passed to [`decrypt_with_context`]. Stores use
/// it to bind a ciphertext to the row it was written to.
pub fn encrypt_with_context(
    key: &SymmetricKey,
    plaintext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let nonce = random_nonce()?;
    let sealed = cipher(key)
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: context,
            },
        )
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(1 + nonce.len() + sealed.len());
    output.push(ALG_TAG_XCHACHA20);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Decrypts data produced by [`encrypt_with_context`] under the same context.
pub fn decrypt_with_context(
    key: &SymmetricKey,
    ciphertext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let (nonce, sealed) = match ciphertext.split_first() {
        None => return Err(EncryptionError::CiphertextTooShort),
        Some((&ALG_TAG_XCHACHA20, rest)) if rest.len() >= XCHACHA20_NONCE_SIZE + TAG_SIZE => {
            rest.split_at(XCHACHA20_NONCE_SIZE)
        }
        Some((&ALG_TAG_XCHACHA20, _)) => return Err(EncryptionError::CiphertextTooShort),
        Some((&tag, _)) => return Err(EncryptionError::UnsupportedAlgorithm(tag)),
    };

    cipher(key)
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: sealed,
                aad: context,
            },
        )
        .map_err(|_| EncryptionError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate().unwrap();
        let ciphertext = encrypt(&key, b"daily key material").unwrap();
        assert_eq!(ciphertext[0], ALG_TAG_XCHACHA20);
        assert_eq!(decrypt(&key, &ciphertext).unwrap(), b"daily key material");
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = SymmetricKey::generate().unwrap();
        let other = SymmetricKey::generate().unwrap();
        let ciphertext = encrypt(&key, b"secret").unwrap();
        assert!(matches!(
            decrypt(&other, &ciphertext),
            Err(EncryptionError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_truncated_and_unknown_tag() {
        let key = SymmetricKey::generate().unwrap();
        assert!(matches!(
            decrypt(&key, &[]),
            Err(EncryptionError::CiphertextTooShort)
        ));
        assert!(matches!(
            decrypt(&key, &[ALG_TAG_XCHACHA20, 1, 2, 3]),
            Err(EncryptionError::CiphertextTooShort)
        ));
        assert!(matches!(
            decrypt(&key, &[0x01; 64]),
            Err(EncryptionError::UnsupportedAlgorithm(0x01))
        ));
    }

    #[test]
    fn test_context_is_authenticated() {
        let key = SymmetricKey::generate().unwrap();
        let ciphertext = encrypt_with_context(&key, b"key for day 7", b"day:7").unwrap();

        assert_eq!(
            decrypt_with_context(&key, &ciphertext, b"day:7").unwrap(),
            b"key for day 7"
        );
        assert!(matches!(
            decrypt_with_context(&key, &ciphertext, b"day:8"),
            Err(EncryptionError::DecryptionFailed)
        ));
        assert!(decrypt(&key, &ciphertext).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([7u8; 32]);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains('7'));
    }
}
