// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod kdf;
pub mod signing;

pub use encryption::{
    decrypt, decrypt_with_context, encrypt, encrypt_with_context, EncryptionError, SymmetricKey,
};
pub use kdf::{hmac_sha256, KDFError, HKDF};
pub use signing::{PublicKey, Signature, SigningError, SigningKeyPair};

/// SHA-256 digest of `data`, hex-encoded.
///
/// Used to reference peer keys in the match ledger without storing the key.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(ring::digest::digest(&ring::digest::SHA256, data))
}
