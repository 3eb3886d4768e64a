use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Daily KPI series in the order the forecast model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiField {
    FatigueMinutes,
    AvgRecoveryTime,
    CoExposure,
    HeatStress,
    AvgHr,
}

impl KpiField {
    pub const ALL: [KpiField; 5] = [
        KpiField::FatigueMinutes,
        KpiField::AvgRecoveryTime,
        KpiField::CoExposure,
        KpiField::HeatStress,
        KpiField::AvgHr,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            KpiField::FatigueMinutes => "fatigue_minutes",
            KpiField::AvgRecoveryTime => "avg_recovery_time",
            KpiField::CoExposure => "co_exposure",
            KpiField::HeatStress => "heat_stress",
            KpiField::AvgHr => "avg_hr",
        }
    }
}

/// Aggregated operational metrics for one working day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyKpi {
    pub fatigue_minutes: f64,
    pub avg_recovery_time: f64,
    pub co_exposure: f64,
    pub heat_stress: f64,
    pub avg_hr: f64,
}

impl DailyKpi {
    pub fn new(
        fatigue_minutes: f64,
        avg_recovery_time: f64,
        co_exposure: f64,
        heat_stress: f64,
        avg_hr: f64,
    ) -> Self {
        Self {
            fatigue_minutes,
            avg_recovery_time,
            co_exposure,
            heat_stress,
            avg_hr,
        }
    }

    pub fn get(&self, field: KpiField) -> f64 {
        match field {
            KpiField::FatigueMinutes => self.fatigue_minutes,
            KpiField::AvgRecoveryTime => self.avg_recovery_time,
            KpiField::CoExposure => self.co_exposure,
            KpiField::HeatStress => self.heat_stress,
            KpiField::AvgHr => self.avg_hr,
        }
    }

    /// Builds a record from a loosely-typed map, as delivered by an external
    /// KPI source. `day` is 1-based and only used for error reporting.
    pub fn from_record(day: usize, record: &HashMap<String, f64>) -> PipelineResult<Self> {
        let value = |field: KpiField| {
            record
                .get(field.key())
                .copied()
                .ok_or(PipelineError::MissingKpiField {
                    day,
                    field: field.key(),
                })
        };

        let kpi = Self {
            fatigue_minutes: value(KpiField::FatigueMinutes)?,
            avg_recovery_time: value(KpiField::AvgRecoveryTime)?,
            co_exposure: value(KpiField::CoExposure)?,
            heat_stress: value(KpiField::HeatStress)?,
            avg_hr: value(KpiField::AvgHr)?,
        };
        kpi.validate(day)?;
        Ok(kpi)
    }

    /// All fields must be finite and non-negative.
    pub fn validate(&self, day: usize) -> PipelineResult<()> {
        for field in KpiField::ALL {
            let value = self.get(field);
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::InvalidKpiValue {
                    day,
                    field: field.key(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Reference week of a worker whose fatigue accumulates day over day.
pub fn mock_week() -> Vec<DailyKpi> {
    vec![
        DailyKpi::new(40.0, 10.0, 5.0, 12.0, 78.0),
        DailyKpi::new(50.0, 12.0, 6.0, 15.0, 80.0),
        DailyKpi::new(60.0, 14.0, 7.0, 18.0, 82.0),
        DailyKpi::new(68.0, 17.0, 8.0, 20.0, 83.0),
        DailyKpi::new(75.0, 19.0, 9.0, 22.0, 85.0),
        DailyKpi::new(80.0, 21.0, 10.0, 24.0, 86.0),
        DailyKpi::new(83.0, 23.0, 11.0, 26.0, 88.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn builds_from_complete_record() {
        let kpi = DailyKpi::from_record(
            1,
            &record(&[
                ("fatigue_minutes", 40.0),
                ("avg_recovery_time", 10.0),
                ("co_exposure", 5.0),
                ("heat_stress", 12.0),
                ("avg_hr", 78.0),
            ]),
        )
        .unwrap();
        assert_eq!(kpi, mock_week()[0]);
    }

    #[test]
    fn missing_field_is_named() {
        let err = DailyKpi::from_record(
            3,
            &record(&[
                ("fatigue_minutes", 40.0),
                ("avg_recovery_time", 10.0),
                ("co_exposure", 5.0),
                ("avg_hr", 78.0),
            ]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingKpiField {
                day: 3,
                field: "heat_stress"
            }
        );
    }

    #[test]
    fn negative_or_nan_values_are_rejected() {
        let mut kpi = mock_week()[0];
        kpi.co_exposure = -1.0;
        assert!(matches!(
            kpi.validate(1),
            Err(PipelineError::InvalidKpiValue { field: "co_exposure", .. })
        ));

        kpi.co_exposure = f64::NAN;
        assert!(kpi.validate(1).is_err());
    }
}
