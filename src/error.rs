use std::time::Duration;

use thiserror::Error;

use crate::models::MetricField;

/// Why a metric could not be read this cycle. Never fatal: the field is
/// marked unavailable and the dependent rule is skipped.
#[derive(Error, Debug)]
pub enum SampleError {
    /// The source exists but failed to produce a value
    #[error("{field} unavailable: {message}")]
    Unavailable { field: MetricField, message: String },

    /// The platform has no source for this metric
    #[error("{field} not supported on this platform")]
    Unsupported { field: MetricField },

    /// The read did not complete within the source timeout
    #[error("{field} read timed out after {after:?}")]
    TimedOut { field: MetricField, after: Duration },

    /// The blocking read task panicked or was cancelled
    #[error("{field} read task failed: {message}")]
    Join { field: MetricField, message: String },
}

impl SampleError {
    pub fn unavailable(field: MetricField, message: impl Into<String>) -> Self {
        Self::Unavailable {
            field,
            message: message.into(),
        }
    }

    pub fn unsupported(field: MetricField) -> Self {
        Self::Unsupported { field }
    }
}
