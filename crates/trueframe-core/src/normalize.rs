// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Maps each detector's method-specific output onto the canonical
//! evidence-of-authenticity scale.
//!
//! The rules are fixed and documented for reproducibility:
//! - primary (depth): `base + bounded bonus`, base 0.8 for a "real" verdict
//!   and 0.2 otherwise, bonus derived from depth variance and layer count
//!   and capped at 0.2, final score clamped to 1.0;
//! - supporting: `1 - artifact_confidence` when an artifact was flagged,
//!   else the detector's own clean confidence;
//! - a detector that did not succeed produces no signal at all. It is never
//!   given a neutral fallback value, so its absence cannot bias the
//!   weighted sum.

use crate::signal::{
    ArtifactFindings, DepthFindings, DetectorFindings, DetectorResult, DetectorStatus,
    NormalizedSignal,
};

const DEPTH_REAL_BASE: f32 = 0.8;
const DEPTH_FAKE_BASE: f32 = 0.2;
const DEPTH_BONUS_CAP: f32 = 0.2;
const DEPTH_VARIANCE_BONUS_SCALE: f32 = 0.1;
const DEPTH_LAYER_FULL_BONUS: f32 = 0.1;
const DEPTH_LAYER_HALF_BONUS: f32 = 0.05;

/// Clamp onto [0,1]; NaN maps to 0 (treated as no evidence of a real scene).
fn unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn depth_score(f: &DepthFindings) -> f32 {
    let base = if f.verdict_real {
        DEPTH_REAL_BASE
    } else {
        DEPTH_FAKE_BASE
    };
    let variance_bonus = unit(f.depth_variance) * DEPTH_VARIANCE_BONUS_SCALE;
    let layer_bonus = match f.layer_count {
        0 | 1 => 0.0,
        2 => DEPTH_LAYER_HALF_BONUS,
        _ => DEPTH_LAYER_FULL_BONUS,
    };
    let bonus = (variance_bonus + layer_bonus).min(DEPTH_BONUS_CAP);
    unit(base + bonus)
}

fn artifact_score(f: &ArtifactFindings) -> f32 {
    if f.artifact_detected {
        1.0 - unit(f.artifact_confidence)
    } else {
        unit(f.clean_confidence)
    }
}

/// Derives the canonical signal for one detector result, or `None` when the
/// detector produced nothing usable (unavailable, timed out, errored, or
/// succeeded without findings).
pub fn normalize(result: &DetectorResult) -> Option<NormalizedSignal> {
    if result.status != DetectorStatus::Success {
        return None;
    }
    let score = match result.findings.as_ref()? {
        DetectorFindings::Depth(f) => depth_score(f),
        DetectorFindings::Artifact(f) => artifact_score(f),
    };
    Some(NormalizedSignal {
        method: result.method,
        score,
        available: true,
    })
}
