use serde::Serialize;

use crate::error::PipelineResult;
use crate::model::{ModelHandle, RegressionModel};

use super::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    /// Predicted next-day fatigue minutes, rounded to one decimal.
    pub fatigue_minutes: f64,
    pub degraded: bool,
}

/// Adapter between the weekly feature vector and the regression model.
#[derive(Clone)]
pub struct WeeklyForecaster {
    model: ModelHandle<dyn RegressionModel>,
    fallback: f64,
}

impl WeeklyForecaster {
    pub fn new(model: ModelHandle<dyn RegressionModel>, fallback: f64) -> Self {
        Self { model, fallback }
    }

    pub fn model(&self) -> &ModelHandle<dyn RegressionModel> {
        &self.model
    }

    pub fn forecast(&self, features: &FeatureVector) -> PipelineResult<Forecast> {
        let (raw, degraded) = match &self.model {
            ModelHandle::Ready(model) => (model.predict(features.as_slice())?, false),
            ModelHandle::Unavailable { .. } => (self.fallback, true),
        };

        Ok(Forecast {
            fatigue_minutes: round_one_decimal(raw),
            degraded,
        })
    }
}

/// Nearest one-decimal value of the exact binary input, ties to even.
pub fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}
