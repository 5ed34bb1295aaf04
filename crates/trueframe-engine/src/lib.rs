// Copyright [2026] [TrueFrame Contributors]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

//! trueframe-engine
//!
//! The asynchronous half of TrueFrame: fans one capture out to every
//! registered detector, verifies the attestation statement, enforces the
//! per-evaluation latency budget, and feeds whatever came back into the
//! deterministic aggregation pipeline from `trueframe-core`. Evaluation is
//! total: detector failures, timeouts, and attestation rejections degrade
//! into statuses and flags rather than errors.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod config;
pub mod detector;
pub mod engine;
pub mod telemetry;

pub use crate::config::{EngineConfig, EngineConfigError};
pub use crate::detector::{AttestationInput, CaptureInput, Detector};
pub use crate::engine::ConfidenceEngine;
pub use crate::telemetry::Telemetry;
