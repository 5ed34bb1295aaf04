// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::error::{TrueFrameError, TrueFrameResult};
use crate::result::ConfidenceLevel;

/// Level boundaries on the aggregated confidence score. A score lands in the
/// highest level whose threshold it meets; below `low` is `Suspicious`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelThresholds {
    pub very_high: f32,
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            very_high: 0.90,
            high: 0.75,
            medium: 0.50,
            low: 0.25,
        }
    }
}

impl LevelThresholds {
    /// Validates that all thresholds lie in (0,1) and strictly descend.
    pub fn validated(self) -> TrueFrameResult<Self> {
        let ordered = [
            ("very_high", self.very_high),
            ("high", self.high),
            ("medium", self.medium),
            ("low", self.low),
        ];
        for (name, t) in ordered {
            if !t.is_finite() || t <= 0.0 || t >= 1.0 {
                return Err(TrueFrameError::InvalidArgument(format!(
                    "threshold {name} must lie strictly inside (0,1)"
                )));
            }
        }
        for pair in ordered.windows(2) {
            if pair[0].1 <= pair[1].1 {
                return Err(TrueFrameError::InvalidArgument(format!(
                    "threshold {} must be greater than {}",
                    pair[0].0, pair[1].0
                )));
            }
        }
        Ok(self)
    }

    pub fn classify(&self, score: f32) -> ConfidenceLevel {
        if score >= self.very_high {
            ConfidenceLevel::VeryHigh
        } else if score >= self.high {
            ConfidenceLevel::High
        } else if score >= self.medium {
            ConfidenceLevel::Medium
        } else if score >= self.low {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Suspicious
        }
    }
}

/// Applies a policy cap: the classified level never exceeds the cap.
pub fn apply_cap(level: ConfidenceLevel, cap: Option<ConfidenceLevel>) -> ConfidenceLevel {
    match cap {
        Some(cap) => level.min(cap),
        None => level,
    }
}
