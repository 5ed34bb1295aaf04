// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pure composition of the aggregation stages.
//!
//! [`evaluate_collected`] is the single entry point: given verified
//! attestation evidence and the raw detector results for one capture, it
//! produces the final [`AggregatedConfidenceResult`]. It performs no I/O and
//! never suspends; given the same inputs it returns a bit-identical result.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::weighted_confidence;
use crate::attestation::AttestationEvidence;
use crate::classify::{apply_cap, LevelThresholds};
use crate::crossval::{cross_check, CrossCheckConfig};
use crate::error::TrueFrameResult;
use crate::normalize::normalize;
use crate::result::{
    AggregatedConfidenceResult, ConfidenceLevel, Flag, MethodBreakdown, ResultStatus,
};
use crate::signal::{DetectorResult, DetectorStatus, MethodId, NormalizedSignal};
use crate::weights::WeightTable;

/// Stamped into every result so stored outputs can be traced to the policy
/// logic that produced them. Bump on any change to the aggregation rules.
pub const ALGORITHM_VERSION: &str = "tf-aggregate/1.0";

/// Complete numeric policy for one evaluation. Constructed from defaults or
/// deserialized from the engine config, then validated once.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    pub weights: WeightTable,
    pub thresholds: LevelThresholds,
    pub cross_check: CrossCheckConfig,
}

impl AggregationPolicy {
    pub fn validated(self) -> TrueFrameResult<Self> {
        Ok(Self {
            weights: self.weights.validated()?,
            thresholds: self.thresholds.validated()?,
            cross_check: self.cross_check.validated()?,
        })
    }
}

/// Evaluates one capture from already-collected inputs.
///
/// Duplicate results for a method are ignored after the first. Detectors
/// that did not succeed are excluded from the weighted sum entirely; their
/// base weight is redistributed over the methods that did answer.
pub fn evaluate_collected(
    evidence: &AttestationEvidence,
    results: &[DetectorResult],
    policy: &AggregationPolicy,
    analysis_time_ms: u64,
    computed_at: DateTime<Utc>,
) -> AggregatedConfidenceResult {
    let mut deduped: BTreeMap<MethodId, DetectorResult> = BTreeMap::new();
    for result in results {
        deduped.entry(result.method).or_insert_with(|| result.clone());
    }

    let signals: BTreeMap<MethodId, NormalizedSignal> = deduped
        .values()
        .filter_map(normalize)
        .map(|s| (s.method, s))
        .collect();
    let available: BTreeSet<MethodId> = signals.keys().copied().collect();

    if available.is_empty() {
        return unavailable_result(evidence, &deduped, analysis_time_ms, computed_at);
    }

    let weights = policy.weights.redistribute(&available);
    let (weighted_sum, contributions) = weighted_confidence(&signals, &weights);
    let outcome = cross_check(&signals, &deduped, &policy.cross_check);

    let overall_confidence = (weighted_sum + outcome.boost).min(1.0);
    let mut flags = outcome.flags;
    let mut level_cap = outcome.level_cap;

    let primary_available = available.contains(&MethodId::Depth);
    if !primary_available {
        level_cap = Some(
            level_cap.map_or(ConfidenceLevel::Medium, |c| c.min(ConfidenceLevel::Medium)),
        );
    }
    if available.len() < MethodId::ALL.len() {
        flags.insert(Flag::PartialAnalysis);
    }

    let confidence_level = if !evidence.valid {
        ConfidenceLevel::Suspicious
    } else {
        let classified = policy.thresholds.classify(overall_confidence);
        let capped = apply_cap(classified, level_cap);
        if capped == ConfidenceLevel::VeryHigh {
            let all_available = available.len() == MethodId::ALL.len();
            if all_available && outcome.full_agreement {
                ConfidenceLevel::VeryHigh
            } else {
                ConfidenceLevel::High
            }
        } else {
            capped
        }
    };

    let mut method_breakdown = BTreeMap::new();
    for method in MethodId::ALL {
        let row = match contributions.iter().find(|c| c.method == method) {
            Some(c) => MethodBreakdown {
                available: true,
                status: DetectorStatus::Success,
                score: c.score,
                weight: c.weight,
                contribution: c.contribution,
            },
            None => MethodBreakdown::absent(reported_status(&deduped, method)),
        };
        method_breakdown.insert(method, row);
    }

    let status = completion_status(&deduped, &available);

    AggregatedConfidenceResult {
        overall_confidence,
        confidence_level,
        method_breakdown,
        primary_signal_valid: evidence.valid,
        supporting_signals_agree: outcome.supporting_signals_agree,
        flags,
        analysis_time_ms,
        computed_at,
        algorithm_version: ALGORITHM_VERSION.to_string(),
        status,
    }
}

fn reported_status(deduped: &BTreeMap<MethodId, DetectorResult>, method: MethodId) -> DetectorStatus {
    deduped
        .get(&method)
        .map(|r| r.status)
        .unwrap_or(DetectorStatus::Unavailable)
}

fn completion_status(
    deduped: &BTreeMap<MethodId, DetectorResult>,
    available: &BTreeSet<MethodId>,
) -> ResultStatus {
    if available.is_empty() {
        ResultStatus::Unavailable
    } else if available.len() == MethodId::ALL.len() {
        ResultStatus::Success
    } else if deduped
        .values()
        .any(|r| r.status == DetectorStatus::Error)
    {
        ResultStatus::Error
    } else {
        ResultStatus::Partial
    }
}

fn unavailable_result(
    evidence: &AttestationEvidence,
    deduped: &BTreeMap<MethodId, DetectorResult>,
    analysis_time_ms: u64,
    computed_at: DateTime<Utc>,
) -> AggregatedConfidenceResult {
    let mut method_breakdown = BTreeMap::new();
    for method in MethodId::ALL {
        method_breakdown.insert(
            method,
            MethodBreakdown::absent(reported_status(deduped, method)),
        );
    }
    AggregatedConfidenceResult {
        overall_confidence: 0.0,
        confidence_level: ConfidenceLevel::Suspicious,
        method_breakdown,
        primary_signal_valid: evidence.valid,
        supporting_signals_agree: true,
        flags: BTreeSet::from([Flag::PartialAnalysis]),
        analysis_time_ms,
        computed_at,
        algorithm_version: ALGORITHM_VERSION.to_string(),
        status: ResultStatus::Unavailable,
    }
}
