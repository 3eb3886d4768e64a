mod types;

pub use types::{InferenceMetrics, MetricsSnapshot};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_INFERENCES: usize = 20;

/// Counters for the ingest path plus a short history of inference timings.
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    recent_inferences: Vec<InferenceMetrics>,
    reading_count: u64,
    rejected_reading_count: u64,
    classification_count: u64,
    degraded_count: u64,
    timeout_count: u64,
    failure_count: u64,
    persist_failure_count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_inferences: Vec::with_capacity(MAX_RECENT_INFERENCES),
                ..MetricsState::default()
            })),
        }
    }

    pub async fn record_reading(&self) {
        self.inner.lock().await.reading_count += 1;
    }

    pub async fn record_rejected_reading(&self) {
        self.inner.lock().await.rejected_reading_count += 1;
    }

    pub async fn record_timeout(&self) {
        self.inner.lock().await.timeout_count += 1;
    }

    pub async fn record_failure(&self) {
        self.inner.lock().await.failure_count += 1;
    }

    pub async fn record_persist_failure(&self) {
        self.inner.lock().await.persist_failure_count += 1;
    }

    pub async fn record_inference(&self, metrics: InferenceMetrics) {
        let mut state = self.inner.lock().await;

        state.classification_count += 1;
        if metrics.degraded {
            state.degraded_count += 1;
        }

        state.recent_inferences.push(metrics);

        if state.recent_inferences.len() > MAX_RECENT_INFERENCES {
            state.recent_inferences.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;

        MetricsSnapshot {
            recent_inferences: state.recent_inferences.clone(),
            reading_count: state.reading_count,
            rejected_reading_count: state.rejected_reading_count,
            classification_count: state.classification_count,
            degraded_count: state.degraded_count,
            timeout_count: state.timeout_count,
            failure_count: state.failure_count,
            persist_failure_count: state.persist_failure_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = MetricsState::default();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
