// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trueframe_core::signal::{DetectorResult, MethodId};

/// One capture handed to the engine. The payload is opaque here; detectors
/// interpret it.
#[derive(Debug, Clone)]
pub struct CaptureInput {
    pub capture_id: String,
    pub payload: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Attestation material accompanying a capture: the device statement blob
/// and the challenge the verifier issued for this capture.
#[derive(Debug, Clone)]
pub struct AttestationInput {
    pub statement_b64: String,
    pub challenge: Vec<u8>,
}

/// One verification method. Implementations run concurrently against the
/// shared latency budget; a new method is added by registering another
/// implementation, never by touching the aggregation pipeline.
///
/// `analyze` is total. An implementation that cannot answer reports it
/// through [`DetectorResult`] statuses; panics are absorbed at the
/// orchestrator boundary and recorded as unavailable.
#[async_trait]
pub trait Detector: Send + Sync {
    fn method(&self) -> MethodId;

    async fn analyze(&self, input: &CaptureInput) -> DetectorResult;
}
