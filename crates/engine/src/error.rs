// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level synchronous errors: the seam where a real `Result::Err`
//! (a bad config, a dead commport) becomes simulated-outcome data.

use smol_str::SmolStr;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid simulation config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Core(#[from] hpcsim_core::CoreError),

    #[error(transparent)]
    Comm(#[from] hpcsim_actor::CommError),

    #[error("unrecognized service-specific argument: {0:?}")]
    UnknownArgument(SmolStr),

    #[error("service does not support this job type")]
    JobTypeNotSupported,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
