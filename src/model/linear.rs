use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::{ModelArtifact, RegressionModel};
use crate::error::{PipelineError, PipelineResult};
use crate::weekly::features::FEATURE_VECTOR_LEN;

/// Linear regressor over the 35 weekly features.
///
/// Artifact format: `{ "coefficients": [f64; 35], "intercept": f64 }`, with
/// coefficients in feature-vector order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearForecastModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearForecastModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self {
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }
}

impl ModelArtifact for LinearForecastModel {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.coefficients.len() == FEATURE_VECTOR_LEN,
            "expected {FEATURE_VECTOR_LEN} coefficients, found {}",
            self.coefficients.len()
        );
        ensure!(
            self.coefficients.iter().all(|c| c.is_finite()) && self.intercept.is_finite(),
            "coefficients must be finite"
        );
        Ok(())
    }
}

impl RegressionModel for LinearForecastModel {
    fn predict(&self, features: &[f64]) -> PipelineResult<f64> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::ModelInference(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }

        let value = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept;

        if value.is_finite() {
            Ok(value)
        } else {
            Err(PipelineError::ModelInference(format!(
                "regression produced non-finite value {value}"
            )))
        }
    }
}
