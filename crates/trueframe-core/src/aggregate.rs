// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Weighted summation over normalized signals.
//!
//! Methods are visited in [`MethodId::ALL`] order regardless of how the
//! inputs arrived, so the floating-point sum is bit-identical across reruns
//! with the same inputs.

use std::collections::BTreeMap;

use crate::signal::{MethodId, NormalizedSignal};

/// One method's share of the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodContribution {
    pub method: MethodId,
    pub score: f32,
    pub weight: f32,
    pub contribution: f32,
}

/// Computes the weighted confidence over the available signals.
///
/// `weights` must already be redistributed over exactly the methods present
/// in `signals`; methods absent from either map contribute nothing.
pub fn weighted_confidence(
    signals: &BTreeMap<MethodId, NormalizedSignal>,
    weights: &BTreeMap<MethodId, f32>,
) -> (f32, Vec<MethodContribution>) {
    let mut total = 0.0f32;
    let mut contributions = Vec::with_capacity(signals.len());
    for method in MethodId::ALL {
        let (Some(signal), Some(weight)) = (signals.get(&method), weights.get(&method)) else {
            continue;
        };
        let contribution = signal.score * weight;
        total += contribution;
        contributions.push(MethodContribution {
            method,
            score: signal.score,
            weight: *weight,
            contribution,
        });
    }
    (total, contributions)
}
