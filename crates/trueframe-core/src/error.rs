// Copyright (c) 2026 TrueFrame Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type TrueFrameResult<T> = Result<T, TrueFrameError>;

#[derive(Debug, Error)]
pub enum TrueFrameError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}
