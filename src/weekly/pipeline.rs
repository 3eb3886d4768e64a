use std::time::Duration;

use serde::Serialize;

use crate::error::PipelineResult;
use crate::model::{run_with_timeout, ModelHandle, RegressionModel};

use super::config::WeeklyConfig;
use super::decision::{decide, RestBreak, RiskLevel, Shift};
use super::features::extract;
use super::forecast::WeeklyForecaster;
use super::kpi::DailyKpi;
use super::report::compose;

/// Structured result of one weekly pipeline run for one worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyForecast {
    pub worker_id: String,
    pub predicted_fatigue_day8: f64,
    pub risk_level: RiskLevel,
    pub shift: Shift,
    pub recommended_shift: String,
    pub recommended_breaks: Vec<RestBreak>,
    pub weekly_report: String,
    /// True when the forecast came from the fallback constant.
    pub degraded: bool,
}

/// Feature extraction → forecast → decision → report, with no state kept
/// between runs.
#[derive(Clone)]
pub struct WeeklyPipeline {
    forecaster: WeeklyForecaster,
    config: WeeklyConfig,
}

impl WeeklyPipeline {
    pub fn new(model: ModelHandle<dyn RegressionModel>, config: WeeklyConfig) -> Self {
        Self {
            forecaster: WeeklyForecaster::new(model, config.fallback_forecast),
            config,
        }
    }

    pub fn forecaster(&self) -> &WeeklyForecaster {
        &self.forecaster
    }

    pub fn config(&self) -> &WeeklyConfig {
        &self.config
    }

    pub fn run(&self, worker_id: &str, days: &[DailyKpi]) -> PipelineResult<WeeklyForecast> {
        let features = extract(days, &self.config)?;
        let forecast = self.forecaster.forecast(&features)?;
        let decision = decide(forecast.fatigue_minutes, &self.config);

        let weekly_report = compose(
            worker_id,
            days,
            forecast.fatigue_minutes,
            decision.risk_level,
            decision.recommended_shift,
            &decision.recommended_breaks,
        );

        Ok(WeeklyForecast {
            worker_id: worker_id.to_string(),
            predicted_fatigue_day8: forecast.fatigue_minutes,
            risk_level: decision.risk_level,
            shift: decision.recommended_shift,
            recommended_shift: decision.recommended_shift.label().to_string(),
            recommended_breaks: decision.recommended_breaks,
            weekly_report,
            degraded: forecast.degraded,
        })
    }

    /// Runs on the blocking pool, giving up after `timeout`.
    pub async fn run_with_timeout(
        &self,
        worker_id: String,
        days: Vec<DailyKpi>,
        timeout: Duration,
    ) -> PipelineResult<WeeklyForecast> {
        let pipeline = self.clone();
        run_with_timeout(timeout, move || pipeline.run(&worker_id, &days)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::model::fixtures::{forecaster, ConstantForecast, FailingForecast};
    use crate::weekly::kpi::mock_week;

    #[test]
    fn mock_week_end_to_end() {
        for (predicted, risk, shift) in [
            (130.04, RiskLevel::High, Shift::Morning),
            (96.26, RiskLevel::Moderate, Shift::Evening),
            (61.0, RiskLevel::Low, Shift::Night),
        ] {
            let pipeline = WeeklyPipeline::new(
                forecaster(ConstantForecast(predicted)),
                WeeklyConfig::default(),
            );
            let result = pipeline.run("W1024", &mock_week()).unwrap();

            let rounded = crate::weekly::forecast::round_one_decimal(predicted);
            assert_eq!(result.predicted_fatigue_day8, rounded);
            assert_eq!(result.risk_level, risk);
            assert_eq!(result.shift, shift);
            assert_eq!(result.recommended_shift, shift.label());
            assert_eq!(result.recommended_breaks.len(), 3);
            assert!(result.weekly_report.contains("W1024"));
            assert!(result.weekly_report.contains(&format!("{rounded:.1}")));
            assert!(!result.degraded);
        }
    }

    #[test]
    fn degraded_forecast_still_produces_full_result() {
        let pipeline =
            WeeklyPipeline::new(ModelHandle::unavailable("no model"), WeeklyConfig::default());
        let result = pipeline.run("W2048", &mock_week()).unwrap();

        assert!(result.degraded);
        assert_eq!(result.predicted_fatigue_day8, 50.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.recommended_shift, "Night acceptable");
        assert!(result.weekly_report.contains("approximately 50.0 minutes"));
    }

    #[test]
    fn inference_failure_aborts_the_run() {
        let pipeline = WeeklyPipeline::new(forecaster(FailingForecast), WeeklyConfig::default());
        assert!(matches!(
            pipeline.run("W1", &mock_week()),
            Err(PipelineError::ModelInference(_))
        ));
    }

    #[test]
    fn short_history_is_rejected_before_inference() {
        let pipeline = WeeklyPipeline::new(forecaster(FailingForecast), WeeklyConfig::default());
        assert!(matches!(
            pipeline.run("W1", &mock_week()[..3]),
            Err(PipelineError::InsufficientHistory { actual: 3, .. })
        ));
    }

    #[tokio::test]
    async fn runs_off_the_async_executor() {
        let pipeline =
            WeeklyPipeline::new(forecaster(ConstantForecast(88.0)), WeeklyConfig::default());
        let result = pipeline
            .run_with_timeout("W9".into(), mock_week(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(result.risk_level, RiskLevel::Moderate);
    }
}
