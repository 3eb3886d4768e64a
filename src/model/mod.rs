//! Handles to the pretrained models behind the realtime and weekly pipelines.
//!
//! Models are loaded once by an explicit load step and injected into the
//! adapters as a [`ModelHandle`]. A handle is either `Ready` with a shared,
//! read-only model or `Unavailable` with the reason the load failed; adapters
//! turn the latter into a degraded result instead of an error.

pub mod inference;
pub mod linear;
pub mod softmax;

#[cfg(test)]
pub(crate) mod fixtures;

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::sensing::buffer::Window;

pub use inference::run_with_timeout;
pub use linear::LinearForecastModel;
pub use softmax::SoftmaxWindowClassifier;

/// Maps a full sample window to one raw score per fatigue class.
pub trait ClassificationModel: Send + Sync {
    fn predict(&self, window: &Window) -> PipelineResult<Vec<f32>>;
}

/// Maps a weekly feature vector to next-day fatigue minutes.
pub trait RegressionModel: Send + Sync {
    fn predict(&self, features: &[f64]) -> PipelineResult<f64>;
}

pub enum ModelHandle<M: ?Sized> {
    Ready(Arc<M>),
    Unavailable { reason: String },
}

impl<M: ?Sized> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        match self {
            ModelHandle::Ready(model) => ModelHandle::Ready(Arc::clone(model)),
            ModelHandle::Unavailable { reason } => ModelHandle::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

impl<M: ?Sized> ModelHandle<M> {
    pub fn ready(model: Arc<M>) -> Self {
        ModelHandle::Ready(model)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelHandle::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ModelHandle::Unavailable { .. })
    }

    pub fn get(&self) -> PipelineResult<&Arc<M>> {
        match self {
            ModelHandle::Ready(model) => Ok(model),
            ModelHandle::Unavailable { reason } => {
                Err(PipelineError::ModelUnavailable(reason.clone()))
            }
        }
    }

    pub fn status(&self) -> ModelStatus {
        match self {
            ModelHandle::Ready(_) => ModelStatus::Ready,
            ModelHandle::Unavailable { reason } => ModelStatus::Degraded {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ModelStatus {
    Ready,
    Degraded { reason: String },
}

/// Artifacts that can check their own dimensions after deserialization.
pub trait ModelArtifact: DeserializeOwned {
    fn validate(&self) -> Result<()>;
}

fn read_artifact<T: ModelArtifact>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read model artifact {}", path.display()))?;
    let artifact: T = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse model artifact {}", path.display()))?;
    artifact
        .validate()
        .with_context(|| format!("model artifact {} is malformed", path.display()))?;
    Ok(artifact)
}

pub fn load_classifier(path: &Path) -> ModelHandle<dyn ClassificationModel> {
    match read_artifact::<SoftmaxWindowClassifier>(path) {
        Ok(model) => {
            info!("Loaded fatigue classifier from {}", path.display());
            let model: Arc<dyn ClassificationModel> = Arc::new(model);
            ModelHandle::ready(model)
        }
        Err(err) => {
            warn!("Fatigue classifier unavailable, running degraded: {err:#}");
            ModelHandle::unavailable(format!("{err:#}"))
        }
    }
}

pub fn load_forecaster(path: &Path) -> ModelHandle<dyn RegressionModel> {
    match read_artifact::<LinearForecastModel>(path) {
        Ok(model) => {
            info!("Loaded weekly forecast model from {}", path.display());
            let model: Arc<dyn RegressionModel> = Arc::new(model);
            ModelHandle::ready(model)
        }
        Err(err) => {
            warn!("Weekly forecast model unavailable, running degraded: {err:#}");
            ModelHandle::unavailable(format!("{err:#}"))
        }
    }
}
