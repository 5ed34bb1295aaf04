// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Identifier of one verification method.
///
/// `Depth` is the primary, hardware-rooted signal. The supporting variants
/// are declared in their stable lexical order so the derived `Ord` yields
/// the deterministic summation order: primary first, then supporting
/// methods lexically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MethodId {
    Depth,
    CompressionArtifact,
    PeriodicPattern,
    SurfaceTexture,
}

impl MethodId {
    /// All configured methods in deterministic summation order.
    pub const ALL: [MethodId; 4] = [
        MethodId::Depth,
        MethodId::CompressionArtifact,
        MethodId::PeriodicPattern,
        MethodId::SurfaceTexture,
    ];

    pub fn is_primary(&self) -> bool {
        matches!(self, MethodId::Depth)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodId::Depth => "depth",
            MethodId::CompressionArtifact => "compression_artifact",
            MethodId::PeriodicPattern => "periodic_pattern",
            MethodId::SurfaceTexture => "surface_texture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStatus {
    Success,
    Unavailable,
    Timeout,
    Error,
}

/// Recapture medium a supporting detector can attribute an artifact to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecaptureSurface {
    Screen,
    Print,
}

/// Raw output of the primary depth detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthFindings {
    /// The detector's own real/fake verdict for the scene.
    pub verdict_real: bool,
    /// Scene depth variance, expected in [0,1].
    pub depth_variance: f32,
    /// Number of distinct depth layers resolved.
    pub layer_count: u32,
}

/// Raw output of a supporting artifact detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFindings {
    pub artifact_detected: bool,
    /// Confidence that the flagged artifact is present, in [0,1].
    pub artifact_confidence: f32,
    /// Confidence that the capture is natural/clean, in [0,1].
    pub clean_confidence: f32,
    /// Set when the artifact points at a specific recapture medium.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recapture_surface: Option<RecaptureSurface>,
}

/// Method-specific raw fields carried by a [`DetectorResult`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorFindings {
    Depth(DepthFindings),
    Artifact(ArtifactFindings),
}

/// One detector's answer for one capture. Produced by an external detector
/// collaborator, consumed as-is by the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    pub method: MethodId,
    pub status: DetectorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub findings: Option<DetectorFindings>,
}

impl DetectorResult {
    pub fn success(method: MethodId, findings: DetectorFindings) -> Self {
        Self {
            method,
            status: DetectorStatus::Success,
            findings: Some(findings),
        }
    }

    pub fn unavailable(method: MethodId) -> Self {
        Self {
            method,
            status: DetectorStatus::Unavailable,
            findings: None,
        }
    }

    pub fn timeout(method: MethodId) -> Self {
        Self {
            method,
            status: DetectorStatus::Timeout,
            findings: None,
        }
    }

    pub fn error(method: MethodId) -> Self {
        Self {
            method,
            status: DetectorStatus::Error,
            findings: None,
        }
    }
}

/// A detector output mapped onto the canonical evidence-of-authenticity
/// scale. Derived once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSignal {
    pub method: MethodId,
    /// 1.0 = strong evidence of a real scene, 0.0 = strong evidence of a
    /// recapture or synthetic artifact.
    pub score: f32,
    pub available: bool,
}
