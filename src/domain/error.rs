// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failures surfaced by the payload build pipeline. A build is all-or-nothing:
/// any of these aborts it and no partial byte output is ever returned.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Percentage mismatch at {level}: sum {sum_bps} bps, expected {expected_bps} bps")]
    PercentMismatch {
        level: String,
        sum_bps: u64,
        expected_bps: u64,
    },

    #[error("Offset for {what} not found inside its enclosing payload")]
    OffsetNotFound { what: String },

    #[error("Offset {offset} for {what} exceeds payload of {len} bytes")]
    OffsetOutOfRange {
        what: String,
        offset: usize,
        len: usize,
    },

    #[error("Record field overflow: {0}")]
    FieldOverflow(String),

    #[error("Plan shape invalid: {0}")]
    InvalidPlan(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// An external pool adapter could not price or produce calldata for a hop.
/// Never retried internally; the caller may drop the pool and rebuild.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("No adapter registered for exchange '{0}'")]
    UnknownExchange(String),

    #[error("Adapter '{exchange}' failed to produce calldata: {reason}")]
    CompileFailed { exchange: String, reason: String },

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// The batched allowance read against the chain failed.
#[derive(Error, Debug)]
pub enum ApprovalCheckError {
    #[error("Allowance batch read failed: {0}")]
    ReadFailed(String),

    #[error("Allowance response length {got} does not match {expected} queried pairs")]
    LengthMismatch { got: usize, expected: usize },

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Top-level error for one payload build.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Approval(#[from] ApprovalCheckError),
}

impl From<config::ConfigError> for BuildError {
    fn from(err: config::ConfigError) -> Self {
        BuildError::Config(err.to_string())
    }
}
