// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HKDF Key Derivation Function
//!
//! HMAC-based Extract-and-Expand Key Derivation Function (RFC 5869) over
//! HMAC-SHA256. Used to derive the per-day identifier key from a daily
//! tracing key.

use ring::hmac;
use thiserror::Error;

const HASH_LEN: usize = 32;

/// KDF error types.
#[derive(Error, Debug)]
pub enum KDFError {
    #[error("Output length exceeds maximum (255 * hash_len)")]
    OutputTooLong,
}

/// HKDF-SHA256 key derivation.
pub struct HKDF;

impl HKDF {
    /// HKDF Extract: PRK = HMAC-SHA256(salt, IKM).
    ///
    /// If salt is None, uses a string of HashLen zeros.
    pub fn extract(salt: Option<&[u8]>, ikm: &[u8]) -> [u8; HASH_LEN] {
        let default_salt = [0u8; HASH_LEN];
        let salt_bytes = salt.unwrap_or(&default_salt);
        hmac_sha256(salt_bytes, ikm)
    }

    /// HKDF Expand: OKM = T(1) || T(2) || ... truncated to `length`.
    ///
    /// where T(i) = HMAC-SHA256(PRK, T(i-1) || info || i)
    pub fn expand(prk: &[u8; HASH_LEN], info: &[u8], length: usize) -> Result<Vec<u8>, KDFError> {
        const MAX_OUTPUT: usize = 255 * HASH_LEN;

        if length > MAX_OUTPUT {
            return Err(KDFError::OutputTooLong);
        }

        if length == 0 {
            return Ok(Vec::new());
        }

        let key = hmac::Key::new(hmac::HMAC_SHA256, prk);
        let n = length.div_ceil(HASH_LEN);

        let mut okm = Vec::with_capacity(n * HASH_LEN);
        let mut t_prev: Vec<u8> = Vec::new();

        for i in 1..=n {
            let mut input = Vec::with_capacity(t_prev.len() + info.len() + 1);
            input.extend_from_slice(&t_prev);
            input.extend_from_slice(info);
            input.push(i as u8);

            let tag = hmac::sign(&key, &input);
            t_prev = tag.as_ref().to_vec();
            okm.extend_from_slice(&t_prev);
        }

        okm.truncate(length);
        Ok(okm)
    }

    /// Full HKDF: Extract-then-Expand in one step.
    pub fn derive(
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
        length: usize,
    ) -> Result<Vec<u8>, KDFError> {
        let prk = Self::extract(salt, ikm);
        Self::expand(&prk, info, length)
    }

    /// Derives a fixed-size key of `N` bytes.
    pub fn derive_array<const N: usize>(
        salt: Option<&[u8]>,
        ikm: &[u8],
        info: &[u8],
    ) -> Result<[u8; N], KDFError> {
        let okm = Self::derive(salt, ikm, info, N)?;
        let mut key = [0u8; N];
        key.copy_from_slice(&okm);
        Ok(key)
    }
}

/// Computes HMAC-SHA256(key, data).
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; HASH_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let tag = hmac::sign(&key, data);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(tag.as_ref());
    out
}
