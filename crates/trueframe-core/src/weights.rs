// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{TrueFrameError, TrueFrameResult};
use crate::signal::MethodId;

const WEIGHT_SUM_EPSILON: f32 = 1e-4;

/// Base weight policy for the configured methods.
///
/// Defaults follow the production policy: the hardware-rooted primary signal
/// carries 0.55, each supporting detector 0.15. Values are configuration,
/// validated at construction, and never read as literals by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub depth: f32,
    pub compression_artifact: f32,
    pub periodic_pattern: f32,
    pub surface_texture: f32,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            depth: 0.55,
            compression_artifact: 0.15,
            periodic_pattern: 0.15,
            surface_texture: 0.15,
        }
    }
}

impl WeightTable {
    /// Validates that every base weight is positive and the table sums to
    /// 1.0 within epsilon.
    pub fn validated(self) -> TrueFrameResult<Self> {
        let entries = [
            ("depth", self.depth),
            ("compression_artifact", self.compression_artifact),
            ("periodic_pattern", self.periodic_pattern),
            ("surface_texture", self.surface_texture),
        ];
        for (name, w) in entries {
            if !w.is_finite() || w <= 0.0 {
                return Err(TrueFrameError::InvalidArgument(format!(
                    "weight for {name} must be a positive finite number"
                )));
            }
        }
        let sum: f32 = entries.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(TrueFrameError::InvalidArgument(format!(
                "weight table must sum to 1.0, got {sum}"
            )));
        }
        Ok(self)
    }

    pub fn base(&self, method: MethodId) -> f32 {
        match method {
            MethodId::Depth => self.depth,
            MethodId::CompressionArtifact => self.compression_artifact,
            MethodId::PeriodicPattern => self.periodic_pattern,
            MethodId::SurfaceTexture => self.surface_texture,
        }
    }

    /// Effective weights over the available methods: each base weight
    /// divided by the sum of available base weights, so the result always
    /// sums to 1.0. An empty set yields an empty map.
    pub fn redistribute(&self, available: &BTreeSet<MethodId>) -> BTreeMap<MethodId, f32> {
        let total: f32 = available.iter().map(|m| self.base(*m)).sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        available
            .iter()
            .map(|m| (*m, self.base(*m) / total))
            .collect()
    }
}
