use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored sensor packet. Only heart rate and body temperature feed the
/// classifier; the environmental channels are kept for KPI aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Option<i64>,
    pub helmet_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub body_temp: f64,
    pub env_temp: Option<f64>,
    pub pressure: Option<f64>,
    pub co_ppm: Option<f64>,
    pub ch4_ppm: Option<f64>,
}
