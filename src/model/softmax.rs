use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::{ClassificationModel, ModelArtifact};
use crate::error::{PipelineError, PipelineResult};
use crate::sensing::buffer::Window;
use crate::sensing::classifier::FatigueLabel;

/// Summary statistics fed to the softmax layer: mean and std-dev of each
/// window column.
const INPUT_FEATURES: usize = 4;

/// Softmax layer over per-channel window statistics.
///
/// Artifact format:
/// ```json
/// { "weights": [[f32; 4]; 3], "bias": [f32; 3] }
/// ```
/// Rows of `weights` are aligned with [`FatigueLabel::CLASSES`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxWindowClassifier {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl SoftmaxWindowClassifier {
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        let model = Self { weights, bias };
        model.validate()?;
        Ok(model)
    }
}

impl ModelArtifact for SoftmaxWindowClassifier {
    fn validate(&self) -> Result<()> {
        let classes = FatigueLabel::CLASSES.len();
        ensure!(
            self.weights.len() == classes,
            "expected {classes} weight rows, found {}",
            self.weights.len()
        );
        ensure!(
            self.bias.len() == classes,
            "expected {classes} bias terms, found {}",
            self.bias.len()
        );
        for (i, row) in self.weights.iter().enumerate() {
            ensure!(
                row.len() == INPUT_FEATURES,
                "weight row {i} has {} columns, expected {INPUT_FEATURES}",
                row.len()
            );
        }
        Ok(())
    }
}

fn mean_and_std(values: impl Iterator<Item = f32> + Clone) -> (f32, f32) {
    let count = values.clone().count().max(1) as f32;
    let mean = values.clone().sum::<f32>() / count;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f32>() / count;
    (mean, variance.sqrt())
}

impl ClassificationModel for SoftmaxWindowClassifier {
    fn predict(&self, window: &Window) -> PipelineResult<Vec<f32>> {
        if window.is_empty() {
            return Err(PipelineError::ModelInference("empty window".into()));
        }

        let (hr_mean, hr_std) = mean_and_std(window.column(0));
        let (temp_mean, temp_std) = mean_and_std(window.column(1));
        let inputs = [hr_mean, hr_std, temp_mean, temp_std];

        let logits: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| row.iter().zip(&inputs).map(|(w, x)| w * x).sum::<f32>() + bias)
            .collect();

        let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max_logit).exp()).collect();
        let total: f32 = exps.iter().sum();

        if !total.is_finite() || total <= 0.0 {
            return Err(PipelineError::ModelInference(format!(
                "softmax produced non-finite normaliser {total}"
            )));
        }

        Ok(exps.into_iter().map(|e| e / total).collect())
    }
}
