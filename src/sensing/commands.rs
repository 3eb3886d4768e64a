use serde::Serialize;

use crate::{
    metrics::MetricsSnapshot,
    model::ModelStatus,
    sensing::{ReadingStatus, SensorPacket},
    AppState,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatusReport {
    pub classifier: ModelStatus,
    pub forecaster: ModelStatus,
}

pub async fn submit_reading(
    state: &AppState,
    packet: SensorPacket,
) -> Result<ReadingStatus, String> {
    state
        .sensing
        .submit_reading(packet)
        .await
        .map_err(|e| e.to_string())
}

pub async fn live_prediction(state: &AppState, helmet_id: String) -> Result<ReadingStatus, String> {
    state
        .sensing
        .live_prediction(&helmet_id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn start_session(state: &AppState, helmet_id: String) -> Result<String, String> {
    if helmet_id.trim().is_empty() {
        return Err("helmet id must not be blank".into());
    }
    Ok(state.sensing.start_session(&helmet_id).await)
}

/// Returns whether the helmet had in-memory state to release.
pub async fn end_session(state: &AppState, helmet_id: String) -> Result<bool, String> {
    Ok(state.sensing.end_session(&helmet_id).await)
}

pub async fn get_metrics(state: &AppState) -> Result<MetricsSnapshot, String> {
    Ok(state.metrics.get_snapshot().await)
}

pub fn model_status(state: &AppState) -> ModelStatusReport {
    ModelStatusReport {
        classifier: state.sensing.classifier().model().status(),
        forecaster: state.weekly.forecaster().model().status(),
    }
}
