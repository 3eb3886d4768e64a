use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

/// Runs a CPU-bound model call on the blocking pool and bounds how long the
/// caller waits for it.
///
/// On timeout the blocking task is left to finish on its own; its result is
/// discarded.
pub async fn run_with_timeout<T, F>(timeout: Duration, task: F) -> PipelineResult<T>
where
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(task);

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(PipelineError::ModelInference(format!(
            "inference worker failed: {join_err}"
        ))),
        Err(_) => Err(PipelineError::InferenceTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
