use thiserror::Error;

use crate::distribution::DistributionKind;

/// Errors raised while building or starting a simulation.
///
/// Every variant is produced before the first pull of a trial; a trial that
/// has started always runs to completion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid {distribution} parameter: {message}")]
    InvalidParameter {
        distribution: DistributionKind,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("configuration mismatch: expected {expected}, got {actual}")]
    ConfigurationMismatch { expected: String, actual: String },
    #[error("unsupported distribution: {0}")]
    UnsupportedDistribution(String),
    #[error("unsupported strategy: {0}")]
    UnsupportedStrategy(String),
}

impl SimulationError {
    pub(crate) fn invalid_parameter(distribution: DistributionKind, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            distribution,
            message: message.into(),
        }
    }

    pub(crate) fn arm_count_mismatch(expected: usize, actual: usize) -> Self {
        Self::ConfigurationMismatch {
            expected: format!("{expected} arms"),
            actual: format!("{actual} arms"),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
