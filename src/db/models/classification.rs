use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensing::classifier::{ClassificationResult, FatigueLabel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRecord {
    pub id: String,
    pub helmet_id: String,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub label: FatigueLabel,
    pub confidence: f32,
    pub scores: Vec<f32>,
    pub degraded: bool,
}

impl ClassificationRecord {
    pub fn from_result(
        helmet_id: &str,
        session_id: Option<String>,
        timestamp: DateTime<Utc>,
        result: &ClassificationResult,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            helmet_id: helmet_id.to_string(),
            session_id,
            timestamp,
            label: result.label,
            confidence: result.confidence,
            scores: result.scores.clone(),
            degraded: result.degraded,
        }
    }

    pub fn result(&self) -> ClassificationResult {
        ClassificationResult {
            label: self.label,
            confidence: self.confidence,
            scores: self.scores.clone(),
            degraded: self.degraded,
        }
    }
}
