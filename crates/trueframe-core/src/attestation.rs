// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key-protection class claimed by an attestation statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyProtectionLevel {
    Software,
    Tee,
    #[serde(rename = "strongbox")]
    StrongBox,
    SecureEnclave,
    Unverified,
}

impl KeyProtectionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyProtectionLevel::Software => "software",
            KeyProtectionLevel::Tee => "tee",
            KeyProtectionLevel::StrongBox => "strongbox",
            KeyProtectionLevel::SecureEnclave => "secure_enclave",
            KeyProtectionLevel::Unverified => "unverified",
        }
    }

    /// Whether this class is an acceptable trust anchor. Software-only key
    /// protection never is.
    pub fn is_hardware_backed(&self) -> bool {
        matches!(
            self,
            KeyProtectionLevel::Tee
                | KeyProtectionLevel::StrongBox
                | KeyProtectionLevel::SecureEnclave
        )
    }
}

impl fmt::Display for KeyProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyProtectionLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "software" => Ok(Self::Software),
            "tee" => Ok(Self::Tee),
            "strongbox" => Ok(Self::StrongBox),
            "secure_enclave" => Ok(Self::SecureEnclave),
            "unverified" => Ok(Self::Unverified),
            _ => Err(()),
        }
    }
}

/// Outcome of attestation verification for one capture. Created once by the
/// verifier and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationEvidence {
    pub platform: String,
    pub level: KeyProtectionLevel,
    pub counter: u64,
    pub valid: bool,
}

impl AttestationEvidence {
    pub fn verified(platform: impl Into<String>, level: KeyProtectionLevel, counter: u64) -> Self {
        Self {
            platform: platform.into(),
            level,
            counter,
            valid: true,
        }
    }

    /// Fail-closed evidence: any parse, signature, or counter failure lands
    /// here.
    pub fn unverified(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            level: KeyProtectionLevel::Unverified,
            counter: 0,
            valid: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_wire_names() {
        assert_eq!(
            serde_json::to_string(&KeyProtectionLevel::StrongBox).unwrap(),
            "\"strongbox\""
        );
        assert_eq!(
            serde_json::to_string(&KeyProtectionLevel::SecureEnclave).unwrap(),
            "\"secure_enclave\""
        );
        assert_eq!(
            "secure_enclave".parse::<KeyProtectionLevel>(),
            Ok(KeyProtectionLevel::SecureEnclave)
        );
        assert!("hsm".parse::<KeyProtectionLevel>().is_err());
    }

    #[test]
    fn software_is_not_hardware_backed() {
        assert!(!KeyProtectionLevel::Software.is_hardware_backed());
        assert!(!KeyProtectionLevel::Unverified.is_hardware_backed());
        assert!(KeyProtectionLevel::Tee.is_hardware_backed());
    }

    #[test]
    fn unverified_evidence_is_invalid() {
        let e = AttestationEvidence::unverified("android");
        assert!(!e.valid);
        assert_eq!(e.level, KeyProtectionLevel::Unverified);
        assert_eq!(e.counter, 0);
    }
}
