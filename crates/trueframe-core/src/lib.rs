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

//! trueframe-core
//!
//! Deterministic confidence math for capture-authenticity verification.
//!
//! This crate implements the pure half of the TrueFrame engine:
//! - canonical normalization of heterogeneous detector outputs onto [0,1]
//! - weight redistribution over the set of available methods
//! - fixed-order weighted aggregation (bit-identical reruns)
//! - cross-validation of primary vs supporting signals (flags, boost, caps)
//! - discrete level classification under hard policy caps
//!
//! Nothing here suspends, allocates shared state, or performs I/O; the
//! orchestrator in `trueframe-engine` collects detector results and hands
//! them to [`pipeline::evaluate_collected`].

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod aggregate;
pub mod attestation;
pub mod classify;
pub mod crossval;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod result;
pub mod signal;
pub mod weights;

pub use crate::error::{TrueFrameError, TrueFrameResult};
pub use crate::pipeline::{evaluate_collected, AggregationPolicy, ALGORITHM_VERSION};
pub use crate::result::{AggregatedConfidenceResult, ConfidenceLevel, Flag, ResultStatus};
pub use crate::signal::{DetectorResult, DetectorStatus, MethodId};
