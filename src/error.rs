use thiserror::Error;

/// Errors raised by the realtime and weekly fatigue pipelines.
///
/// Validation errors describe caller-supplied data and are returned as soon as
/// they are detected. `ModelUnavailable` is normally absorbed into a degraded
/// result by the adapters; it only surfaces from the model loaders.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid sample shape: expected {expected} values, got {actual}")]
    InvalidSampleShape { expected: usize, actual: usize },

    #[error("window shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("daily KPI record for day {day} is missing field '{field}'")]
    MissingKpiField { day: usize, field: &'static str },

    #[error("daily KPI field '{field}' on day {day} has invalid value {value}")]
    InvalidKpiValue {
        day: usize,
        field: &'static str,
        value: f64,
    },

    #[error("expected {expected} daily KPI records, got {actual}")]
    InsufficientHistory { expected: usize, actual: usize },

    #[error("sensor packet field '{field}' rejected: {reason}")]
    InvalidPacket { field: &'static str, reason: String },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("model inference failed: {0}")]
    ModelInference(String),

    #[error("model inference timed out after {timeout_ms}ms")]
    InferenceTimeout { timeout_ms: u64 },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
