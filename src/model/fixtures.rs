//! Test doubles for the model traits.

use std::sync::Arc;
use std::time::Duration;

use super::{ClassificationModel, ModelHandle, RegressionModel};
use crate::error::{PipelineError, PipelineResult};
use crate::sensing::buffer::Window;

pub struct FixedScores(pub Vec<f32>);

impl ClassificationModel for FixedScores {
    fn predict(&self, _window: &Window) -> PipelineResult<Vec<f32>> {
        Ok(self.0.clone())
    }
}

pub struct FailingClassifier;

impl ClassificationModel for FailingClassifier {
    fn predict(&self, _window: &Window) -> PipelineResult<Vec<f32>> {
        Err(PipelineError::ModelInference("tensor runtime crashed".into()))
    }
}

pub struct SlowClassifier(pub Duration);

impl ClassificationModel for SlowClassifier {
    fn predict(&self, _window: &Window) -> PipelineResult<Vec<f32>> {
        std::thread::sleep(self.0);
        Ok(vec![1.0, 0.0, 0.0])
    }
}

pub struct ConstantForecast(pub f64);

impl RegressionModel for ConstantForecast {
    fn predict(&self, _features: &[f64]) -> PipelineResult<f64> {
        Ok(self.0)
    }
}

pub struct FailingForecast;

impl RegressionModel for FailingForecast {
    fn predict(&self, _features: &[f64]) -> PipelineResult<f64> {
        Err(PipelineError::ModelInference("regressor raised".into()))
    }
}

pub fn classifier(model: impl ClassificationModel + 'static) -> ModelHandle<dyn ClassificationModel> {
    let model: Arc<dyn ClassificationModel> = Arc::new(model);
    ModelHandle::ready(model)
}

pub fn forecaster(model: impl RegressionModel + 'static) -> ModelHandle<dyn RegressionModel> {
    let model: Arc<dyn RegressionModel> = Arc::new(model);
    ModelHandle::ready(model)
}
