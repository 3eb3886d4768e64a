//! Weekly trend features over daily KPI series.
//!
//! Each KPI series contributes seven numbers, in this order: mean, max,
//! population std-dev, latest value, least-squares slope against day index,
//! EWMA, and the latest/first ratio. Series are laid out field-major in
//! [`KpiField::ALL`] order; the forecast model reads the vector positionally.

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

use super::config::WeeklyConfig;
use super::kpi::{DailyKpi, KpiField};

pub const FEATURES_PER_FIELD: usize = 7;
pub const FEATURE_VECTOR_LEN: usize = FEATURES_PER_FIELD * KpiField::ALL.len();

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The seven features of one KPI series.
    pub fn field(&self, field: KpiField) -> &[f64] {
        let index = KpiField::ALL
            .iter()
            .position(|f| *f == field)
            .unwrap_or_default();
        let start = index * FEATURES_PER_FIELD;
        &self.0[start..start + FEATURES_PER_FIELD]
    }
}

pub fn extract(days: &[DailyKpi], config: &WeeklyConfig) -> PipelineResult<FeatureVector> {
    if days.len() != config.days {
        return Err(PipelineError::InsufficientHistory {
            expected: config.days,
            actual: days.len(),
        });
    }
    for (i, day) in days.iter().enumerate() {
        day.validate(i + 1)?;
    }

    let mut features = Vec::with_capacity(FEATURE_VECTOR_LEN);
    for field in KpiField::ALL {
        let series: Vec<f64> = days.iter().map(|d| d.get(field)).collect();
        features.extend(series_features(&series, config));
    }

    Ok(FeatureVector(features))
}

fn series_features(series: &[f64], config: &WeeklyConfig) -> [f64; FEATURES_PER_FIELD] {
    let first = series.first().copied().unwrap_or_default();
    let last = series.last().copied().unwrap_or_default();

    [
        mean(series),
        series.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        population_std(series),
        last,
        ols_slope(series),
        ewma(series, config.ewma_alpha),
        last / (first + config.ratio_epsilon),
    ]
}

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

pub fn population_std(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let m = mean(series);
    let variance = series.iter().map(|v| (v - m).powi(2)).sum::<f64>() / series.len() as f64;
    variance.sqrt()
}

/// Slope of the least-squares line through `(i, series[i-1])` for i = 1..n.
pub fn ols_slope(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n as f64 + 1.0) / 2.0;
    let y_mean = mean(series);

    let (num, den) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = (i + 1) as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });

    num / den
}

/// EWMA seeded with the first value. Written as `v + α(x - v)` so a constant
/// series stays exactly constant.
pub fn ewma(series: &[f64], alpha: f64) -> f64 {
    let mut values = series.iter();
    let Some(&seed) = values.next() else {
        return 0.0;
    };
    values.fold(seed, |v, &x| v + alpha * (x - v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weekly::kpi::mock_week;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn vector_is_field_major_with_35_entries() {
        let features = extract(&mock_week(), &WeeklyConfig::default()).unwrap();
        assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        assert_eq!(FEATURE_VECTOR_LEN, 35);

        let fatigue = features.field(KpiField::FatigueMinutes);
        assert!(close(fatigue[0], 456.0 / 7.0));
        assert_eq!(fatigue[1], 83.0);
        assert!((fatigue[2] - 14.797959042946927).abs() < 1e-9);
        assert_eq!(fatigue[3], 83.0);
        assert!(close(fatigue[4], 204.0 / 28.0));
        assert!((fatigue[5] - 75.60704).abs() < 1e-9);
        assert!((fatigue[6] - 83.0 / (40.0 + 1e-6)).abs() < 1e-12);

        assert_eq!(&features.as_slice()[..7], fatigue);
        assert_eq!(features.field(KpiField::AvgHr)[3], 88.0);
        assert_eq!(features.as_slice()[28 + 3], 88.0);
    }

    #[test]
    fn reversing_the_week_flips_trend_but_not_level() {
        let config = WeeklyConfig::default();
        let week = mock_week();
        let mut reversed = week.clone();
        reversed.reverse();

        let forward = extract(&week, &config).unwrap();
        let backward = extract(&reversed, &config).unwrap();

        for field in KpiField::ALL {
            let f = forward.field(field);
            let b = backward.field(field);
            assert!(close(f[0], b[0]), "{field:?} mean changed");
            assert_eq!(f[1], b[1], "{field:?} max changed");
            assert!(f[4] > 0.0 && b[4] < 0.0, "{field:?} slope sign did not flip");
            assert!(close(f[4], -b[4]));
            assert_ne!(f[6], b[6], "{field:?} ratio unchanged");
        }
    }

    #[test]
    fn constant_series_ewma_is_exact() {
        for c in [0.0, 0.1, 7.3, 83.0, 1234.567] {
            assert_eq!(ewma(&[c; 7], 0.4), c);
        }
    }

    #[test]
    fn ewma_follows_recurrence() {
        let series = [10.0, 20.0, 30.0];
        let v2 = 0.4 * 20.0 + 0.6 * 10.0;
        let v3 = 0.4 * 30.0 + 0.6 * v2;
        assert!(close(ewma(&series, 0.4), v3));
    }

    #[test]
    fn zero_first_day_does_not_divide_by_zero() {
        let mut week = mock_week();
        week[0].co_exposure = 0.0;
        let features = extract(&week, &WeeklyConfig::default()).unwrap();
        let ratio = features.field(KpiField::CoExposure)[6];
        assert!(ratio.is_finite());
        assert!(close(ratio, 11.0 / 1e-6));
    }

    #[test]
    fn requires_exactly_seven_days() {
        let week = mock_week();
        assert_eq!(
            extract(&week[..6], &WeeklyConfig::default()),
            Err(PipelineError::InsufficientHistory {
                expected: 7,
                actual: 6
            })
        );
    }
}
