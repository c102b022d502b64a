// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagnosis keys: daily tracing keys of a diagnosed peer, signed by the
//! health authority that confirmed the diagnosis.

use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, Signature, SigningKeyPair};
use crate::identity::DailyTracingKey;

/// Authority signature over a diagnosis key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySignature {
    /// Signing authority.
    pub authority: PublicKey,
    /// Unix seconds at which the authority signed.
    pub signed_at: u64,
    pub signature: Signature,
}

/// Why a diagnosis key's signature was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureProblem {
    Missing,
    UntrustedAuthority,
    Invalid,
}

/// A daily tracing key published for exposure matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisKey {
    pub key: DailyTracingKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<AuthoritySignature>,
}

impl DiagnosisKey {
    /// Wraps a key without a signature.
    pub fn unsigned(key: DailyTracingKey) -> Self {
        DiagnosisKey {
            key,
            signature: None,
        }
    }

    /// Signs `key` on behalf of `authority`.
    pub fn sign(key: DailyTracingKey, authority: &SigningKeyPair, signed_at: u64) -> Self {
        let signature = authority.sign(&Self::signed_message(&key, signed_at));
        DiagnosisKey {
            key,
            signature: Some(AuthoritySignature {
                authority: authority.public_key(),
                signed_at,
                signature,
            }),
        }
    }

    /// Bytes covered by the authority signature.
    pub fn signed_message(key: &DailyTracingKey, signed_at: u64) -> Vec<u8> {
        let mut message = b"tracekit-diagnosis-key-v1".to_vec();
        message.extend_from_slice(&key.signing_bytes());
        message.extend_from_slice(&signed_at.to_be_bytes());
        message
    }

    /// Checks that the key is signed by one of `trusted`.
    pub fn verify(&self, trusted: &[PublicKey]) -> Result<(), SignatureProblem> {
        let sig = self.signature.as_ref().ok_or(SignatureProblem::Missing)?;

        if !trusted.contains(&sig.authority) {
            return Err(SignatureProblem::UntrustedAuthority);
        }

        let message = Self::signed_message(&self.key, sig.signed_at);
        if sig.authority.verify(&message, &sig.signature) {
            Ok(())
        } else {
            Err(SignatureProblem::Invalid)
        }
    }

    /// Stable identity of the key for the folded-match ledger.
    ///
    /// Covers key bytes and rolling start only, so re-published keys with a
    /// different risk level or signature still fold once.
    pub fn fingerprint(&self) -> String {
        let mut material = self.key.key_data().to_vec();
        material.extend_from_slice(&self.key.rolling_start_number().0.to_be_bytes());
        crate::crypto::fingerprint(&material)
    }
}

/// Ordered batch of diagnosis keys handed to the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisKeySet {
    pub keys: Vec<DiagnosisKey>,
}

impl DiagnosisKeySet {
    pub fn new(keys: Vec<DiagnosisKey>) -> Self {
        DiagnosisKeySet { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosisKey> {
        self.keys.iter()
    }

    /// Splits the set into batches of at most `max` keys, preserving order.
    pub fn into_batches(self, max: usize) -> Vec<DiagnosisKeySet> {
        let max = max.max(1);
        let mut batches = Vec::with_capacity(self.keys.len().div_ceil(max));
        let mut keys = self.keys.into_iter().peekable();
        while keys.peek().is_some() {
            batches.push(DiagnosisKeySet::new(keys.by_ref().take(max).collect()));
        }
        batches
    }
}

impl FromIterator<DiagnosisKey> for DiagnosisKeySet {
    fn from_iter<I: IntoIterator<Item = DiagnosisKey>>(iter: I) -> Self {
        DiagnosisKeySet::new(iter.into_iter().collect())
    }
}
