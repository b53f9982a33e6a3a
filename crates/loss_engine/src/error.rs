//! Error types for the loss simulation kernel.
//!
//! Every failure is surfaced to the caller as a [`SimulationError`]; no
//! partial output buffer is ever returned alongside an error.

use thiserror::Error;

/// Simulation error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// A caller-supplied parameter violates its contract.
    ///
    /// Raised before any stream is derived or any worker is scheduled.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        reason: String,
    },

    /// A pseudorandom stream could not be initialised.
    #[error("Stream initialisation failed: {0}")]
    StreamInitialisation(String),

    /// A worker failed while filling its partition.
    #[error("Worker {worker} failed: {reason}")]
    WorkerFailure {
        /// Partition index of the failing worker.
        worker: usize,
        /// Description of the failure.
        reason: String,
    },

    /// The worker thread pool could not be built.
    #[error("Thread pool construction failed: {0}")]
    ThreadPool(String),
}

impl SimulationError {
    /// Convenience constructor for [`SimulationError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimulationError::invalid("sigma", "must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'sigma': must be positive, got 0"
        );

        let err = SimulationError::WorkerFailure {
            worker: 3,
            reason: "panicked".to_string(),
        };
        assert!(err.to_string().contains("Worker 3"));

        let err = SimulationError::StreamInitialisation("entropy unavailable".to_string());
        assert!(err.to_string().contains("entropy unavailable"));
    }
}
