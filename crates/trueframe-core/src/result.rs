// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::TrueFrameResult;
use crate::signal::{DetectorStatus, MethodId};

const DOMAIN_RESULT_V1: &[u8] = b"trueframe:result:v1";

/// Discrete confidence level. Variants are declared in ascending order so
/// the derived `Ord` lets policy caps apply as a plain `min`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Suspicious,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Suspicious => "suspicious",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory flags attached to a result. Kept in a `BTreeSet` so the wire
/// order is stable across reruns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    MethodsDisagree,
    PartialAnalysis,
    PrimarySupportingDisagree,
    PrintDetected,
    ScreenDetected,
}

/// Completion status of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Every configured method produced a usable signal.
    Success,
    /// At least one usable signal, but not all configured methods.
    Partial,
    /// No usable signal at all. The score carries no information.
    Unavailable,
    /// At least one detector reported an internal error; the score covers
    /// the methods that did answer.
    Error,
}

/// Per-method row of the audit breakdown. Unavailable methods appear with
/// zero weight so the row set always covers the configured methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodBreakdown {
    pub available: bool,
    pub status: DetectorStatus,
    /// Normalized score, 0.0 when unavailable.
    pub score: f32,
    /// Effective weight after redistribution, 0.0 when unavailable.
    pub weight: f32,
    /// `score * weight`, the method's share of the overall confidence.
    pub contribution: f32,
}

impl MethodBreakdown {
    pub fn absent(status: DetectorStatus) -> Self {
        Self {
            available: false,
            status,
            score: 0.0,
            weight: 0.0,
            contribution: 0.0,
        }
    }
}

/// Final output of one evaluation. Serialized for clients and hashed for
/// audit logs; every field is deterministic given the same inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedConfidenceResult {
    /// Weighted confidence in [0,1] after boost and caps.
    pub overall_confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub method_breakdown: BTreeMap<MethodId, MethodBreakdown>,
    /// Whether the hardware attestation for this capture verified.
    pub primary_signal_valid: bool,
    pub supporting_signals_agree: bool,
    pub flags: BTreeSet<Flag>,
    pub analysis_time_ms: u64,
    pub computed_at: DateTime<Utc>,
    pub algorithm_version: String,
    pub status: ResultStatus,
}

impl AggregatedConfidenceResult {
    /// Canonical serialization with lexically sorted object keys, the form
    /// that [`summary_digest_hex`](Self::summary_digest_hex) hashes.
    pub fn canonical_json(&self) -> TrueFrameResult<Vec<u8>> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_vec(&sort_json(value))?)
    }

    /// Domain-separated SHA-256 of the canonical serialization, hex-encoded.
    pub fn summary_digest_hex(&self) -> TrueFrameResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_RESULT_V1);
        hasher.update(self.canonical_json()?);
        Ok(hex::encode(hasher.finalize()))
    }
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> AggregatedConfidenceResult {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(
            MethodId::Depth,
            MethodBreakdown {
                available: true,
                status: DetectorStatus::Success,
                score: 0.9,
                weight: 1.0,
                contribution: 0.9,
            },
        );
        for m in [
            MethodId::CompressionArtifact,
            MethodId::PeriodicPattern,
            MethodId::SurfaceTexture,
        ] {
            breakdown.insert(m, MethodBreakdown::absent(DetectorStatus::Unavailable));
        }
        AggregatedConfidenceResult {
            overall_confidence: 0.9,
            confidence_level: ConfidenceLevel::High,
            method_breakdown: breakdown,
            primary_signal_valid: true,
            supporting_signals_agree: true,
            flags: BTreeSet::from([Flag::PartialAnalysis]),
            analysis_time_ms: 42,
            computed_at: Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
            algorithm_version: "tf-aggregate/1.0".to_string(),
            status: ResultStatus::Partial,
        }
    }

    #[test]
    fn levels_order_ascending() {
        assert!(ConfidenceLevel::Suspicious < ConfidenceLevel::Low);
        assert!(ConfidenceLevel::Low < ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium < ConfidenceLevel::High);
        assert!(ConfidenceLevel::High < ConfidenceLevel::VeryHigh);
    }

    #[test]
    fn level_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::VeryHigh).unwrap(),
            "\"very_high\""
        );
        assert_eq!(
            serde_json::to_string(&Flag::PrimarySupportingDisagree).unwrap(),
            "\"primary_supporting_disagree\""
        );
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let bytes = sample().canonical_json().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let algorithm = text.find("\"algorithm_version\"").unwrap();
        let status = text.find("\"status\"").unwrap();
        assert!(algorithm < status);
    }

    #[test]
    fn digest_is_stable_across_reruns() {
        let a = sample().summary_digest_hex().unwrap();
        let b = sample().summary_digest_hex().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn digest_changes_with_content() {
        let base = sample();
        let mut other = sample();
        other.overall_confidence = 0.5;
        assert_ne!(
            base.summary_digest_hex().unwrap(),
            other.summary_digest_hex().unwrap()
        );
    }

    #[test]
    fn result_roundtrips() {
        let r = sample();
        let json = serde_json::to_string(&r).unwrap();
        let back: AggregatedConfidenceResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
