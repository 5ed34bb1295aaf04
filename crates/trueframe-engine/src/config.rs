// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use trueframe_core::pipeline::AggregationPolicy;
use trueframe_core::TrueFrameError;

const DEFAULT_LATENCY_BUDGET_MS: u64 = 200;

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("policy file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("policy rejected: {0}")]
    Policy(#[from] TrueFrameError),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wall-clock budget for one evaluation. Detectors still running when
    /// it expires are recorded as timed out.
    pub latency_budget_ms: u64,
    /// Bind address for the Prometheus text endpoint, when enabled.
    pub metrics_addr: Option<SocketAddr>,
    pub policy: AggregationPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: DEFAULT_LATENCY_BUDGET_MS,
            metrics_addr: None,
            policy: AggregationPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with `TRUEFRAME_*` environment overrides. Unset or
    /// unparseable variables keep the default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.latency_budget_ms =
            read_env_u64("TRUEFRAME_LATENCY_BUDGET_MS", cfg.latency_budget_ms);
        cfg.metrics_addr = std::env::var("TRUEFRAME_METRICS_ADDR")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok());
        cfg
    }

    /// Replaces the aggregation policy with a validated table loaded from a
    /// JSON file.
    pub fn with_policy_file(mut self, path: impl AsRef<Path>) -> Result<Self, EngineConfigError> {
        self.policy = load_policy(path)?;
        Ok(self)
    }
}

pub fn load_policy(path: impl AsRef<Path>) -> Result<AggregationPolicy, EngineConfigError> {
    let payload = std::fs::read(path)?;
    let policy: AggregationPolicy = serde_json::from_slice(&payload)?;
    Ok(policy.validated()?)
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
