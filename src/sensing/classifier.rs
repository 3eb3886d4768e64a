use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::model::{run_with_timeout, ClassificationModel, ModelHandle};

use super::buffer::{Window, SAMPLE_WIDTH, WINDOW_CAPACITY};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FatigueLabel {
    Normal,
    Stressed,
    Fatigue,
    /// Emitted only in degraded mode, when no model is loaded.
    Error,
}

impl FatigueLabel {
    /// Classes in model output order.
    pub const CLASSES: [FatigueLabel; 3] = [
        FatigueLabel::Normal,
        FatigueLabel::Stressed,
        FatigueLabel::Fatigue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FatigueLabel::Normal => "Normal",
            FatigueLabel::Stressed => "Stressed",
            FatigueLabel::Fatigue => "Fatigue",
            FatigueLabel::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub label: FatigueLabel,
    /// Winning class score as a percentage in `[0, 100]`.
    pub confidence: f32,
    /// Raw scores aligned with [`FatigueLabel::CLASSES`].
    pub scores: Vec<f32>,
    pub degraded: bool,
}

impl ClassificationResult {
    pub fn degraded() -> Self {
        Self {
            label: FatigueLabel::Error,
            confidence: 0.0,
            scores: vec![0.0; FatigueLabel::CLASSES.len()],
            degraded: true,
        }
    }

    fn from_scores(scores: Vec<f32>) -> PipelineResult<Self> {
        if scores.len() != FatigueLabel::CLASSES.len() {
            return Err(PipelineError::ModelInference(format!(
                "expected {} class scores, got {}",
                FatigueLabel::CLASSES.len(),
                scores.len()
            )));
        }

        if let Some((i, score)) = scores
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || !(0.0..=1.0).contains(*s))
        {
            return Err(PipelineError::ModelInference(format!(
                "class score {i} is {score}, expected a probability in [0, 1]"
            )));
        }

        // First maximum wins on ties.
        let mut best = 0;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }

        Ok(Self {
            label: FatigueLabel::CLASSES[best],
            confidence: scores[best] * 100.0,
            scores,
            degraded: false,
        })
    }
}

/// Adapter between a full sample window and the fatigue classification model.
#[derive(Clone)]
pub struct RealtimeClassifier {
    model: ModelHandle<dyn ClassificationModel>,
}

impl RealtimeClassifier {
    pub fn new(model: ModelHandle<dyn ClassificationModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelHandle<dyn ClassificationModel> {
        &self.model
    }

    pub fn classify(&self, window: &Window) -> PipelineResult<ClassificationResult> {
        let (rows, cols) = window.shape();
        if rows != WINDOW_CAPACITY || cols != SAMPLE_WIDTH {
            return Err(PipelineError::ShapeMismatch {
                expected_rows: WINDOW_CAPACITY,
                expected_cols: SAMPLE_WIDTH,
                rows,
                cols,
            });
        }

        match &self.model {
            ModelHandle::Ready(model) => ClassificationResult::from_scores(model.predict(window)?),
            ModelHandle::Unavailable { .. } => Ok(ClassificationResult::degraded()),
        }
    }

    /// Classifies on the blocking pool, giving up after `timeout`.
    pub async fn classify_with_timeout(
        &self,
        window: Window,
        timeout: Duration,
    ) -> PipelineResult<ClassificationResult> {
        let classifier = self.clone();
        run_with_timeout(timeout, move || classifier.classify(&window)).await
    }
}
