// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for Cryptographic Primitives
//!
//! Authority signatures, encryption at rest and the HKDF/HMAC primitives the
//! identifier derivation is built on.

use tracekit_core::crypto::{
    decrypt, encrypt, fingerprint, hmac_sha256, EncryptionError, PublicKey, SigningKeyPair,
    SymmetricKey, HKDF,
};
use tracekit_core::identity::DailyTracingKey;
use tracekit_core::time::DayNumber;
use tracekit_core::RotatingIdentityGenerator;

// =============================================================================
// Ed25519 Authority Keys
// =============================================================================

#[test]
fn test_generated_keypairs_are_unique() {
    let keypair1 = SigningKeyPair::generate().unwrap();
    let keypair2 = SigningKeyPair::generate().unwrap();

    assert_ne!(
        keypair1.public_key().as_bytes(),
        keypair2.public_key().as_bytes(),
        "Generated keypairs should be unique"
    );
}

#[test]
fn test_keypair_from_seed_deterministic() {
    let seed = [42u8; 32];

    let keypair1 = SigningKeyPair::from_seed(&seed).unwrap();
    let keypair2 = SigningKeyPair::from_seed(&seed).unwrap();

    assert_eq!(keypair1.public_key(), keypair2.public_key());
}

#[test]
fn test_signature_verifies_only_original_message() {
    let keypair = SigningKeyPair::generate().unwrap();
    let message = b"diagnosis key batch";
    let signature = keypair.sign(message);

    assert!(keypair.public_key().verify(message, &signature));
    assert!(!keypair.public_key().verify(b"diagnosis key batcH", &signature));

    let other = SigningKeyPair::generate().unwrap();
    assert!(!other.public_key().verify(message, &signature));
}

#[test]
fn test_public_key_hex_roundtrip() {
    let keypair = SigningKeyPair::generate().unwrap();
    let public = keypair.public_key();

    let parsed = PublicKey::from_hex(&hex::encode(public.as_bytes())).unwrap();
    assert_eq!(parsed, public);
    assert!(PublicKey::from_hex("not hex").is_err());
}

// =============================================================================
// XChaCha20-Poly1305 Encryption at Rest
// =============================================================================

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let key = SymmetricKey::generate().unwrap();
    let plaintext = [7u8; 16];

    let ciphertext = encrypt(&key, &plaintext).unwrap();
    assert_ne!(&ciphertext[..], &plaintext[..]);
    assert_eq!(decrypt(&key, &ciphertext).unwrap(), plaintext);
}

#[test]
fn test_encryption_uses_fresh_nonces() {
    let key = SymmetricKey::generate().unwrap();
    let a = encrypt(&key, b"same").unwrap();
    let b = encrypt(&key, b"same").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_decrypt_with_wrong_key_fails() {
    let key = SymmetricKey::generate().unwrap();
    let other = SymmetricKey::generate().unwrap();
    let ciphertext = encrypt(&key, b"daily key").unwrap();

    assert!(matches!(
        decrypt(&other, &ciphertext),
        Err(EncryptionError::DecryptionFailed)
    ));
}

#[test]
fn test_tampered_ciphertext_rejected() {
    let key = SymmetricKey::generate().unwrap();
    let mut ciphertext = encrypt(&key, b"daily key").unwrap();
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x01;

    assert!(decrypt(&key, &ciphertext).is_err());
    assert!(matches!(
        decrypt(&key, &[0x02, 1, 2, 3]),
        Err(EncryptionError::CiphertextTooShort)
    ));
    assert!(matches!(
        decrypt(&key, &[0x01; 64]),
        Err(EncryptionError::UnsupportedAlgorithm(0x01))
    ));
}

// =============================================================================
// HKDF / HMAC (RFC 5869, RFC 4231)
// =============================================================================

#[test]
fn test_hmac_sha256_rfc4231_case_2() {
    let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
    assert_eq!(
        hex::encode(mac),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn test_hkdf_rfc5869_case_1() {
    let ikm = [0x0bu8; 22];
    let salt: Vec<u8> = (0x00..=0x0c).collect();
    let info: Vec<u8> = (0xf0..=0xf9).collect();

    let prk = HKDF::extract(Some(&salt), &ikm);
    assert_eq!(
        hex::encode(prk),
        "077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5"
    );

    let okm = HKDF::derive(Some(&salt), &ikm, &info, 42).unwrap();
    assert_eq!(
        hex::encode(okm),
        "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
    );
}

#[test]
fn test_hkdf_rejects_oversized_output() {
    assert!(HKDF::derive(None, b"ikm", b"info", 255 * 32 + 1).is_err());
    assert!(HKDF::derive(None, b"ikm", b"info", 0).unwrap().is_empty());
}

#[test]
fn test_identifier_derivation_matches_primitives() {
    let day = DayNumber(19_000);
    let key = DailyTracingKey::new([0x11; 16], day);
    let interval = tracekit_core::time::IntervalNumber(day.first_interval().0 + 5);

    let identifier_key: [u8; 16] = HKDF::derive_array(None, key.key_data(), b"EN-RPIK").unwrap();
    let mut padded = [0u8; 16];
    padded[..6].copy_from_slice(b"EN-RPI");
    padded[12..].copy_from_slice(&interval.0.to_le_bytes());
    let mac = hmac_sha256(&identifier_key, &padded);

    let identifier = RotatingIdentityGenerator::new()
        .current_identifier(&key, interval)
        .unwrap();
    assert_eq!(&identifier.as_bytes()[..], &mac[..16]);
}

#[test]
fn test_fingerprint_is_sha256_hex() {
    assert_eq!(
        fingerprint(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
