// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fan-out/fan-in orchestration for one capture evaluation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};

use trueframe_attest::{AttestationVerifier, ReplayCounterStore};
use trueframe_core::attestation::AttestationEvidence;
use trueframe_core::pipeline::evaluate_collected;
use trueframe_core::result::AggregatedConfidenceResult;
use trueframe_core::signal::{DetectorResult, DetectorStatus, MethodId};

use crate::config::EngineConfig;
use crate::detector::{AttestationInput, CaptureInput, Detector};
use crate::telemetry::Telemetry;

/// Platform recorded when no attestation statement accompanied the capture.
const NO_ATTESTATION_PLATFORM: &str = "unknown";

/// Orchestrates detectors and attestation verification for captures.
///
/// Read-only after construction; evaluations borrow it immutably and are
/// safe to run concurrently.
pub struct ConfidenceEngine<S> {
    config: EngineConfig,
    detectors: Vec<Arc<dyn Detector>>,
    verifier: AttestationVerifier<S>,
    telemetry: Telemetry,
}

impl<S: ReplayCounterStore> ConfidenceEngine<S> {
    pub fn new(
        config: EngineConfig,
        detectors: Vec<Arc<dyn Detector>>,
        verifier: AttestationVerifier<S>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            config,
            detectors,
            verifier,
            telemetry,
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Evaluates one capture. Total: every failure mode degrades into
    /// detector statuses, flags, or fail-closed attestation evidence.
    pub async fn evaluate(
        &self,
        capture: CaptureInput,
        attestation: Option<AttestationInput>,
    ) -> AggregatedConfidenceResult {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.config.latency_budget_ms);
        let capture = Arc::new(capture);

        let mut handles = Vec::with_capacity(self.detectors.len());
        for detector in &self.detectors {
            let detector = Arc::clone(detector);
            let input = Arc::clone(&capture);
            let method = detector.method();
            handles.push((
                method,
                tokio::spawn(async move { detector.analyze(&input).await }),
            ));
        }

        let evidence = self.verify_attestation(attestation.as_ref());

        let mut results = Vec::with_capacity(handles.len());
        for (method, mut handle) in handles {
            let result = match timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) if result.method == method => result,
                Ok(Ok(result)) => {
                    tracing::warn!(
                        capture_id = %capture.capture_id,
                        expected = method.as_str(),
                        got = result.method.as_str(),
                        "detector answered for the wrong method"
                    );
                    DetectorResult::unavailable(method)
                }
                Ok(Err(join_error)) => {
                    tracing::warn!(
                        capture_id = %capture.capture_id,
                        method = method.as_str(),
                        error = %join_error,
                        "detector task failed"
                    );
                    DetectorResult::unavailable(method)
                }
                Err(_) => {
                    handle.abort();
                    self.telemetry.record_detector_timeout(method);
                    DetectorResult::timeout(method)
                }
            };
            if result.status == DetectorStatus::Error {
                self.telemetry.record_detector_error(method);
            }
            results.push(result);
        }

        let analysis_time_ms = start.elapsed().as_millis() as u64;
        let result = evaluate_collected(
            &evidence,
            &results,
            &self.config.policy,
            analysis_time_ms,
            Utc::now(),
        );

        self.telemetry.record_evaluation(result.confidence_level);
        tracing::info!(
            capture_id = %capture.capture_id,
            level = result.confidence_level.as_str(),
            confidence = result.overall_confidence,
            status = ?result.status,
            analysis_time_ms,
            "capture evaluated"
        );
        result
    }

    fn verify_attestation(&self, attestation: Option<&AttestationInput>) -> AttestationEvidence {
        match attestation {
            Some(input) => {
                let outcome = self
                    .verifier
                    .verify_encoded(&input.statement_b64, &input.challenge);
                if let Some(reason) = outcome.reject {
                    self.telemetry.record_attestation_reject(reason.as_str());
                }
                outcome.evidence
            }
            None => {
                self.telemetry.record_attestation_reject("missing_statement");
                AttestationEvidence::unverified(NO_ATTESTATION_PLATFORM)
            }
        }
    }

    /// Methods covered by the registered detectors, in registration order.
    pub fn registered_methods(&self) -> Vec<MethodId> {
        self.detectors.iter().map(|d| d.method()).collect()
    }
}
