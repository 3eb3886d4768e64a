use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensing::classifier::FatigueLabel;

/// Timing breakdown for one classified window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceMetrics {
    pub timestamp: DateTime<Utc>,
    pub helmet_id: Option<String>,
    pub label: FatigueLabel,
    pub inference_ms: u64,
    pub db_write_ms: Option<u64>,
    pub total_ms: u64,
    pub degraded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub recent_inferences: Vec<InferenceMetrics>,
    pub reading_count: u64,
    pub rejected_reading_count: u64,
    pub classification_count: u64,
    pub degraded_count: u64,
    pub timeout_count: u64,
    pub failure_count: u64,
    pub persist_failure_count: u64,
}
