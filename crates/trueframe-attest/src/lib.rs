// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Verification of hardware-backed capture attestation statements.
//!
//! A capture device signs `sha256(domain || challenge || be64(counter))`
//! with a key whose public half is registered in the trusted key set. The
//! verifier checks the signature, enforces strictly increasing per-key
//! counters against replay, and rejects key-protection classes that are not
//! hardware backed. Every failure path is fail-closed: the caller always
//! receives [`AttestationEvidence`], and on any failure it is marked
//! invalid so downstream aggregation can never treat the capture as
//! hardware rooted.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use trueframe_core::attestation::{AttestationEvidence, KeyProtectionLevel};

const DOMAIN_ATTEST_V1: &[u8] = b"trueframe:attest:v1";

/// Platform recorded when a statement is too malformed to name one.
const UNKNOWN_PLATFORM: &str = "unknown";

#[derive(Debug, Error)]
pub enum AttestError {
    #[error("trusted keys file: {0}")]
    TrustedKeysIo(#[from] std::io::Error),
    #[error("trusted keys file is not valid JSON: {0}")]
    TrustedKeysJson(#[from] serde_json::Error),
    #[error("trusted key {kid} is not a valid ed25519 public key")]
    InvalidTrustedKey { kid: String },
    #[error("statement encoding failed: {0}")]
    Encode(serde_json::Error),
}

/// Why a statement failed verification. Reported for logs and metrics; the
/// evidence handed to aggregation only carries the fail-closed `valid` bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MalformedStatement,
    PlatformNotAllowed,
    UnknownKeyId,
    SignatureMismatch,
    CounterReplayed,
    SoftwareKeyProtection,
}

impl RejectReason {
    pub const ALL: [RejectReason; 6] = [
        RejectReason::MalformedStatement,
        RejectReason::PlatformNotAllowed,
        RejectReason::UnknownKeyId,
        RejectReason::SignatureMismatch,
        RejectReason::CounterReplayed,
        RejectReason::SoftwareKeyProtection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MalformedStatement => "malformed_statement",
            RejectReason::PlatformNotAllowed => "platform_not_allowed",
            RejectReason::UnknownKeyId => "unknown_key_id",
            RejectReason::SignatureMismatch => "signature_mismatch",
            RejectReason::CounterReplayed => "counter_replayed",
            RejectReason::SoftwareKeyProtection => "software_key_protection",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signed attestation statement as transported from the capture device,
/// base64-wrapped JSON on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationStatement {
    pub platform: String,
    pub key_id: String,
    pub key_protection: KeyProtectionLevel,
    pub counter: u64,
    pub signature_b64: String,
}

impl AttestationStatement {
    pub fn encode_b64(&self) -> Result<String, AttestError> {
        let json = serde_json::to_vec(self).map_err(AttestError::Encode)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    pub fn decode_b64(encoded: &str) -> Option<Self> {
        let json = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// The digest the device signs: domain-separated hash of the verifier
/// challenge and the big-endian replay counter.
pub fn signing_digest(challenge: &[u8], counter: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_ATTEST_V1);
    hasher.update(challenge);
    hasher.update(counter.to_be_bytes());
    hasher.finalize().into()
}

/// Produces a signed statement. Used by provisioning tooling and tests;
/// production devices sign inside their secure element.
pub fn sign_statement(
    signing_key: &SigningKey,
    platform: impl Into<String>,
    key_id: impl Into<String>,
    key_protection: KeyProtectionLevel,
    counter: u64,
    challenge: &[u8],
) -> AttestationStatement {
    let signature = signing_key.sign(&signing_digest(challenge, counter));
    AttestationStatement {
        platform: platform.into(),
        key_id: key_id.into(),
        key_protection,
        counter,
        signature_b64: base64::engine::general_purpose::STANDARD.encode(signature.to_bytes()),
    }
}

#[derive(Debug, Deserialize)]
struct TrustedKeysFile {
    keys: BTreeMap<String, String>,
}

/// Registered device public keys, keyed by key id.
#[derive(Debug, Clone, Default)]
pub struct TrustedAttestationKeys {
    keys: BTreeMap<String, VerifyingKey>,
}

impl TrustedAttestationKeys {
    /// Loads a `{"keys": {"<kid>": "<hex public key>"}}` JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AttestError> {
        let payload = std::fs::read(path)?;
        let file: TrustedKeysFile = serde_json::from_slice(&payload)?;
        let mut out = Self::default();
        for (kid, key_hex) in file.keys {
            let bytes: [u8; 32] = hex::decode(&key_hex)
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| AttestError::InvalidTrustedKey { kid: kid.clone() })?;
            let key = VerifyingKey::from_bytes(&bytes)
                .map_err(|_| AttestError::InvalidTrustedKey { kid: kid.clone() })?;
            out.keys.insert(kid, key);
        }
        Ok(out)
    }

    pub fn insert(&mut self, kid: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(kid.into(), key);
    }

    pub fn get(&self, kid: &str) -> Option<&VerifyingKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Persisted high-water mark of accepted counters per key id.
///
/// Counters must be strictly increasing; `advance` is only called after a
/// statement fully verifies, so a rejected statement never burns a value.
pub trait ReplayCounterStore: Send + Sync {
    fn last_accepted(&self, key_id: &str) -> Option<u64>;
    fn advance(&self, key_id: &str, counter: u64);
}

/// Counter store for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<BTreeMap<String, u64>>,
}

impl ReplayCounterStore for InMemoryCounterStore {
    fn last_accepted(&self, key_id: &str) -> Option<u64> {
        self.counters.lock().get(key_id).copied()
    }

    fn advance(&self, key_id: &str, counter: u64) {
        let mut counters = self.counters.lock();
        let entry = counters.entry(key_id.to_string()).or_insert(0);
        if counter > *entry {
            *entry = counter;
        }
    }
}

/// Deployment policy for statement acceptance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationPolicy {
    /// Platforms accepted by this deployment. `None` accepts all.
    pub accept_platforms: Option<BTreeSet<String>>,
}

impl AttestationPolicy {
    fn allows(&self, platform: &str) -> bool {
        match &self.accept_platforms {
            Some(platforms) => platforms.contains(platform),
            None => true,
        }
    }
}

/// Outcome of verifying one statement. `evidence` is always present and
/// fail-closed; `reject` names the first check that failed, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub evidence: AttestationEvidence,
    pub reject: Option<RejectReason>,
}

impl VerificationOutcome {
    fn rejected(platform: &str, reason: RejectReason) -> Self {
        tracing::warn!(platform, reason = %reason, "attestation statement rejected");
        Self {
            evidence: AttestationEvidence::unverified(platform),
            reject: Some(reason),
        }
    }
}

/// Stateless checks plus the replay high-water mark. One verifier instance
/// serves all captures; it holds no per-capture state.
pub struct AttestationVerifier<S> {
    trusted: TrustedAttestationKeys,
    counters: S,
    policy: AttestationPolicy,
}

impl<S: ReplayCounterStore> AttestationVerifier<S> {
    pub fn new(trusted: TrustedAttestationKeys, counters: S) -> Self {
        Self {
            trusted,
            counters,
            policy: AttestationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AttestationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn trusted_keys(&self) -> &TrustedAttestationKeys {
        &self.trusted
    }

    /// Verifies a base64-wrapped statement against the challenge issued for
    /// this capture.
    pub fn verify_encoded(&self, encoded: &str, challenge: &[u8]) -> VerificationOutcome {
        match AttestationStatement::decode_b64(encoded) {
            Some(statement) => self.verify(&statement, challenge),
            None => {
                VerificationOutcome::rejected(UNKNOWN_PLATFORM, RejectReason::MalformedStatement)
            }
        }
    }

    /// Checks run in fixed order: platform policy, key lookup, signature,
    /// replay counter, key-protection policy. The first failure wins and
    /// the counter is only advanced after every check passes.
    pub fn verify(&self, statement: &AttestationStatement, challenge: &[u8]) -> VerificationOutcome {
        let platform = statement.platform.as_str();

        if !self.policy.allows(platform) {
            return VerificationOutcome::rejected(platform, RejectReason::PlatformNotAllowed);
        }

        let Some(key) = self.trusted.get(&statement.key_id) else {
            return VerificationOutcome::rejected(platform, RejectReason::UnknownKeyId);
        };

        let Some(signature) = decode_signature(&statement.signature_b64) else {
            return VerificationOutcome::rejected(platform, RejectReason::MalformedStatement);
        };
        let digest = signing_digest(challenge, statement.counter);
        if key.verify(&digest, &signature).is_err() {
            return VerificationOutcome::rejected(platform, RejectReason::SignatureMismatch);
        }

        if let Some(last) = self.counters.last_accepted(&statement.key_id) {
            if statement.counter <= last {
                return VerificationOutcome::rejected(platform, RejectReason::CounterReplayed);
            }
        }

        if !statement.key_protection.is_hardware_backed() {
            tracing::warn!(
                platform,
                level = %statement.key_protection,
                "attestation key protection is not hardware backed"
            );
            // Level is preserved so audit logs show what the device claimed.
            return VerificationOutcome {
                evidence: AttestationEvidence {
                    platform: platform.to_string(),
                    level: statement.key_protection,
                    counter: statement.counter,
                    valid: false,
                },
                reject: Some(RejectReason::SoftwareKeyProtection),
            };
        }

        self.counters.advance(&statement.key_id, statement.counter);
        VerificationOutcome {
            evidence: AttestationEvidence::verified(
                platform,
                statement.key_protection,
                statement.counter,
            ),
            reject: None,
        }
    }
}

fn decode_signature(signature_b64: &str) -> Option<Signature> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(signature_b64)
        .ok()?;
    let arr: [u8; 64] = bytes.try_into().ok()?;
    Some(Signature::from_bytes(&arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::io::Write;

    const CHALLENGE: &[u8] = b"challenge-0001";

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::generate(&mut OsRng);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    fn verifier_with(kid: &str, key: VerifyingKey) -> AttestationVerifier<InMemoryCounterStore> {
        let mut trusted = TrustedAttestationKeys::default();
        trusted.insert(kid, key);
        AttestationVerifier::new(trusted, InMemoryCounterStore::default())
    }

    fn statement(signing: &SigningKey, counter: u64) -> AttestationStatement {
        sign_statement(
            signing,
            "android",
            "device-1",
            KeyProtectionLevel::StrongBox,
            counter,
            CHALLENGE,
        )
    }

    #[test]
    fn valid_statement_verifies() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let outcome = verifier.verify(&statement(&signing, 1), CHALLENGE);
        assert_eq!(outcome.reject, None);
        assert!(outcome.evidence.valid);
        assert_eq!(outcome.evidence.level, KeyProtectionLevel::StrongBox);
        assert_eq!(outcome.evidence.counter, 1);
    }

    #[test]
    fn encoded_roundtrip_verifies() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let encoded = statement(&signing, 5).encode_b64().unwrap();
        let outcome = verifier.verify_encoded(&encoded, CHALLENGE);
        assert!(outcome.evidence.valid);
    }

    #[test]
    fn garbage_input_is_malformed() {
        let (_, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let outcome = verifier.verify_encoded("not-base64!!!", CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::MalformedStatement));
        assert!(!outcome.evidence.valid);
        assert_eq!(outcome.evidence.level, KeyProtectionLevel::Unverified);
    }

    #[test]
    fn unknown_key_id_rejects() {
        let (signing, _) = keypair();
        let (_, other_key) = keypair();
        let verifier = verifier_with("other-device", other_key);
        let outcome = verifier.verify(&statement(&signing, 1), CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::UnknownKeyId));
        assert!(!outcome.evidence.valid);
    }

    #[test]
    fn wrong_challenge_is_signature_mismatch() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let outcome = verifier.verify(&statement(&signing, 1), b"different-challenge");
        assert_eq!(outcome.reject, Some(RejectReason::SignatureMismatch));
    }

    #[test]
    fn tampered_counter_is_signature_mismatch() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let mut s = statement(&signing, 1);
        s.counter = 2;
        let outcome = verifier.verify(&s, CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::SignatureMismatch));
    }

    #[test]
    fn replayed_counter_rejects_second_use() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let s = statement(&signing, 3);
        assert!(verifier.verify(&s, CHALLENGE).evidence.valid);
        let outcome = verifier.verify(&s, CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::CounterReplayed));

        // Lower counters are also burned.
        let outcome = verifier.verify(&statement(&signing, 2), CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::CounterReplayed));

        // The next counter still works.
        assert!(verifier.verify(&statement(&signing, 4), CHALLENGE).evidence.valid);
    }

    #[test]
    fn rejected_statement_does_not_burn_counter() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let outcome = verifier.verify(&statement(&signing, 1), b"wrong");
        assert!(outcome.reject.is_some());
        assert!(verifier.verify(&statement(&signing, 1), CHALLENGE).evidence.valid);
    }

    #[test]
    fn software_protection_rejects_but_preserves_level() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying);
        let s = sign_statement(
            &signing,
            "android",
            "device-1",
            KeyProtectionLevel::Software,
            1,
            CHALLENGE,
        );
        let outcome = verifier.verify(&s, CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::SoftwareKeyProtection));
        assert!(!outcome.evidence.valid);
        assert_eq!(outcome.evidence.level, KeyProtectionLevel::Software);

        // Policy rejection happens before the counter advances.
        let hw = statement(&signing, 1);
        assert!(verifier.verify(&hw, CHALLENGE).evidence.valid);
    }

    #[test]
    fn platform_allowlist_rejects_unlisted() {
        let (signing, verifying) = keypair();
        let verifier = verifier_with("device-1", verifying).with_policy(AttestationPolicy {
            accept_platforms: Some(BTreeSet::from(["ios".to_string()])),
        });
        let outcome = verifier.verify(&statement(&signing, 1), CHALLENGE);
        assert_eq!(outcome.reject, Some(RejectReason::PlatformNotAllowed));
        assert!(!outcome.evidence.valid);
    }

    #[test]
    fn empty_policy_accepts_any_platform() {
        let (signing, verifying) = keypair();
        let verifier =
            verifier_with("device-1", verifying).with_policy(AttestationPolicy::default());
        assert!(verifier.verify(&statement(&signing, 1), CHALLENGE).evidence.valid);
    }

    #[test]
    fn trusted_keys_load_from_json() {
        let (_, verifying) = keypair();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = format!(
            "{{\"keys\":{{\"device-1\":\"{}\"}}}}",
            hex::encode(verifying.to_bytes())
        );
        file.write_all(json.as_bytes()).unwrap();
        let trusted = TrustedAttestationKeys::load(file.path()).unwrap();
        assert_eq!(trusted.len(), 1);
        assert_eq!(trusted.get("device-1"), Some(&verifying));
    }

    #[test]
    fn trusted_keys_reject_bad_hex() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"keys\":{\"device-1\":\"zz\"}}").unwrap();
        assert!(matches!(
            TrustedAttestationKeys::load(file.path()),
            Err(AttestError::InvalidTrustedKey { .. })
        ));
    }

    #[test]
    fn digest_is_domain_separated() {
        let plain: [u8; 32] = {
            let mut h = Sha256::new();
            h.update(CHALLENGE);
            h.update(1u64.to_be_bytes());
            h.finalize().into()
        };
        assert_ne!(signing_digest(CHALLENGE, 1), plain);
    }
}
