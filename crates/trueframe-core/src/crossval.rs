// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pairwise agreement checks between the primary and supporting signals.
//!
//! A method "agrees with real" when its normalized score exceeds the
//! agreement threshold. Full agreement across two or more available methods
//! earns a small boost; any primary-vs-supporting conflict caps the final
//! level at `Medium`, and a recapture attribution above the configured raw
//! confidence hard-caps at `Medium` regardless of the numeric score.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{TrueFrameError, TrueFrameResult};
use crate::result::{ConfidenceLevel, Flag};
use crate::signal::{
    DetectorFindings, DetectorResult, DetectorStatus, MethodId, NormalizedSignal,
    RecaptureSurface,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckConfig {
    /// Added to the weighted sum on full agreement, clamped at 1.0.
    pub agreement_boost: f32,
    /// Scores strictly above this count as "agrees with real".
    pub agreement_threshold: f32,
    /// Raw artifact confidence above which a recapture attribution hard-caps
    /// the level.
    pub recapture_flag_threshold: f32,
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            agreement_boost: 0.05,
            agreement_threshold: 0.5,
            recapture_flag_threshold: 0.7,
        }
    }
}

impl CrossCheckConfig {
    pub fn validated(self) -> TrueFrameResult<Self> {
        if !self.agreement_boost.is_finite() || !(0.0..1.0).contains(&self.agreement_boost) {
            return Err(TrueFrameError::InvalidArgument(
                "agreement_boost must lie in [0,1)".to_string(),
            ));
        }
        for (name, t) in [
            ("agreement_threshold", self.agreement_threshold),
            ("recapture_flag_threshold", self.recapture_flag_threshold),
        ] {
            if !t.is_finite() || t <= 0.0 || t >= 1.0 {
                return Err(TrueFrameError::InvalidArgument(format!(
                    "{name} must lie strictly inside (0,1)"
                )));
            }
        }
        Ok(self)
    }
}

/// What the cross-validation pass decided for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCheckOutcome {
    pub boost: f32,
    pub level_cap: Option<ConfidenceLevel>,
    pub flags: BTreeSet<Flag>,
    pub supporting_signals_agree: bool,
    /// Two or more methods were available and every verdict matched.
    pub full_agreement: bool,
}

fn cap_at_medium(cap: &mut Option<ConfidenceLevel>) {
    *cap = Some(match cap {
        Some(existing) => (*existing).min(ConfidenceLevel::Medium),
        None => ConfidenceLevel::Medium,
    });
}

/// Runs the agreement and recapture checks over the available signals.
///
/// `results` is the deduplicated raw input, consulted only for recapture
/// attributions; agreement works on the normalized `signals`.
pub fn cross_check(
    signals: &BTreeMap<MethodId, NormalizedSignal>,
    results: &BTreeMap<MethodId, DetectorResult>,
    config: &CrossCheckConfig,
) -> CrossCheckOutcome {
    let mut flags = BTreeSet::new();
    let mut level_cap = None;

    let verdicts: BTreeMap<MethodId, bool> = signals
        .iter()
        .map(|(m, s)| (*m, s.score > config.agreement_threshold))
        .collect();

    let primary = verdicts.get(&MethodId::Depth).copied();
    let supporting: Vec<bool> = verdicts
        .iter()
        .filter(|(m, _)| !m.is_primary())
        .map(|(_, v)| *v)
        .collect();

    let primary_conflict = match primary {
        Some(p) => supporting.iter().any(|s| *s != p),
        None => false,
    };
    let supporting_disagree =
        supporting.contains(&true) && supporting.contains(&false);

    if primary_conflict {
        flags.insert(Flag::PrimarySupportingDisagree);
        cap_at_medium(&mut level_cap);
    } else if supporting_disagree {
        flags.insert(Flag::MethodsDisagree);
    }

    let full_agreement = verdicts.len() >= 2 && {
        let mut values = verdicts.values();
        let first = values.next().copied().unwrap_or(false);
        values.all(|v| *v == first)
    };
    let boost = if full_agreement {
        config.agreement_boost
    } else {
        0.0
    };

    // One available method means no evaluable pair at all.
    let supporting_signals_agree = !supporting_disagree;
    if verdicts.len() < 2 {
        flags.insert(Flag::PartialAnalysis);
    }

    for result in results.values() {
        if result.status != DetectorStatus::Success {
            continue;
        }
        let Some(DetectorFindings::Artifact(findings)) = result.findings.as_ref() else {
            continue;
        };
        if !findings.artifact_detected
            || findings.artifact_confidence <= config.recapture_flag_threshold
        {
            continue;
        }
        match findings.recapture_surface {
            Some(RecaptureSurface::Screen) => {
                flags.insert(Flag::ScreenDetected);
                cap_at_medium(&mut level_cap);
            }
            Some(RecaptureSurface::Print) => {
                flags.insert(Flag::PrintDetected);
                cap_at_medium(&mut level_cap);
            }
            None => {}
        }
    }

    CrossCheckOutcome {
        boost,
        level_cap,
        flags,
        supporting_signals_agree,
        full_agreement,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ArtifactFindings;

    fn signals(pairs: &[(MethodId, f32)]) -> BTreeMap<MethodId, NormalizedSignal> {
        pairs
            .iter()
            .map(|(m, score)| {
                (
                    *m,
                    NormalizedSignal {
                        method: *m,
                        score: *score,
                        available: true,
                    },
                )
            })
            .collect()
    }

    fn artifact_result(
        method: MethodId,
        surface: Option<RecaptureSurface>,
        confidence: f32,
    ) -> (MethodId, DetectorResult) {
        (
            method,
            DetectorResult::success(
                method,
                DetectorFindings::Artifact(ArtifactFindings {
                    artifact_detected: true,
                    artifact_confidence: confidence,
                    clean_confidence: 1.0 - confidence,
                    recapture_surface: surface,
                }),
            ),
        )
    }

    #[test]
    fn full_agreement_earns_boost() {
        let s = signals(&[
            (MethodId::Depth, 0.9),
            (MethodId::CompressionArtifact, 0.8),
            (MethodId::SurfaceTexture, 0.7),
        ]);
        let out = cross_check(&s, &BTreeMap::new(), &CrossCheckConfig::default());
        assert!((out.boost - 0.05).abs() < 1e-6);
        assert!(out.level_cap.is_none());
        assert!(out.flags.is_empty());
        assert!(out.supporting_signals_agree);
        assert!(out.full_agreement);
    }

    #[test]
    fn agreement_on_fake_also_counts_as_agreement() {
        let s = signals(&[(MethodId::Depth, 0.2), (MethodId::SurfaceTexture, 0.1)]);
        let out = cross_check(&s, &BTreeMap::new(), &CrossCheckConfig::default());
        assert!((out.boost - 0.05).abs() < 1e-6);
        assert!(out.flags.is_empty());
    }

    #[test]
    fn primary_conflict_caps_at_medium() {
        let s = signals(&[
            (MethodId::Depth, 0.9),
            (MethodId::CompressionArtifact, 0.8),
            (MethodId::SurfaceTexture, 0.2),
        ]);
        let out = cross_check(&s, &BTreeMap::new(), &CrossCheckConfig::default());
        assert_eq!(out.boost, 0.0);
        assert_eq!(out.level_cap, Some(ConfidenceLevel::Medium));
        assert!(out.flags.contains(&Flag::PrimarySupportingDisagree));
        // The supporting pair itself also disagrees, but the primary
        // conflict takes precedence over the softer flag.
        assert!(!out.flags.contains(&Flag::MethodsDisagree));
        assert!(!out.supporting_signals_agree);
        assert!(!out.full_agreement);
    }

    #[test]
    fn supporting_only_disagreement_flags_without_cap() {
        let s = signals(&[
            (MethodId::CompressionArtifact, 0.8),
            (MethodId::SurfaceTexture, 0.2),
        ]);
        let out = cross_check(&s, &BTreeMap::new(), &CrossCheckConfig::default());
        assert!(out.flags.contains(&Flag::MethodsDisagree));
        assert!(out.level_cap.is_none());
        assert!(!out.supporting_signals_agree);
    }

    #[test]
    fn single_method_is_trivially_agreeing_partial() {
        let s = signals(&[(MethodId::Depth, 0.9)]);
        let out = cross_check(&s, &BTreeMap::new(), &CrossCheckConfig::default());
        assert_eq!(out.boost, 0.0);
        assert!(out.supporting_signals_agree);
        assert!(out.flags.contains(&Flag::PartialAnalysis));
    }

    #[test]
    fn recapture_above_threshold_hard_caps() {
        let s = signals(&[(MethodId::Depth, 0.9), (MethodId::PeriodicPattern, 0.15)]);
        let results = BTreeMap::from([artifact_result(
            MethodId::PeriodicPattern,
            Some(RecaptureSurface::Screen),
            0.85,
        )]);
        let out = cross_check(&s, &results, &CrossCheckConfig::default());
        assert!(out.flags.contains(&Flag::ScreenDetected));
        assert_eq!(out.level_cap, Some(ConfidenceLevel::Medium));
    }

    #[test]
    fn recapture_at_threshold_does_not_flag() {
        let s = signals(&[(MethodId::Depth, 0.9), (MethodId::PeriodicPattern, 0.3)]);
        let results = BTreeMap::from([artifact_result(
            MethodId::PeriodicPattern,
            Some(RecaptureSurface::Print),
            0.7,
        )]);
        let out = cross_check(&s, &results, &CrossCheckConfig::default());
        assert!(!out.flags.contains(&Flag::PrintDetected));
    }

    #[test]
    fn artifact_without_surface_never_recapture_flags() {
        let s = signals(&[(MethodId::Depth, 0.9), (MethodId::CompressionArtifact, 0.1)]);
        let results = BTreeMap::from([artifact_result(MethodId::CompressionArtifact, None, 0.95)]);
        let out = cross_check(&s, &results, &CrossCheckConfig::default());
        assert!(!out.flags.contains(&Flag::ScreenDetected));
        assert!(!out.flags.contains(&Flag::PrintDetected));
    }

    #[test]
    fn config_validation_bounds() {
        assert!(CrossCheckConfig::default().validated().is_ok());
        assert!(CrossCheckConfig {
            agreement_boost: 1.0,
            ..CrossCheckConfig::default()
        }
        .validated()
        .is_err());
        assert!(CrossCheckConfig {
            agreement_threshold: 0.0,
            ..CrossCheckConfig::default()
        }
        .validated()
        .is_err());
    }
}
