/// Offset of a rest break from shift start, and how long it lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakSlot {
    pub offset_minutes: i64,
    pub duration_minutes: u32,
}

/// Tunable constants of the weekly forecasting pipeline.
#[derive(Debug, Clone)]
pub struct WeeklyConfig {
    /// Number of daily records the extractor requires.
    pub days: usize,

    /// EWMA smoothing factor applied oldest to newest.
    pub ewma_alpha: f64,

    /// Added to the day-1 value before computing the day-7/day-1 ratio.
    pub ratio_epsilon: f64,

    /// Forecast used when the regression model is unavailable.
    pub fallback_forecast: f64,

    /// Predictions strictly above this are HIGH risk.
    pub high_risk_above: f64,

    /// Predictions strictly above this (and not HIGH) are MODERATE risk.
    pub moderate_risk_above: f64,

    pub break_slots: Vec<BreakSlot>,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            days: 7,
            ewma_alpha: 0.4,
            ratio_epsilon: 1e-6,
            fallback_forecast: 50.0,
            high_risk_above: 120.0,
            moderate_risk_above: 80.0,
            break_slots: vec![
                BreakSlot {
                    offset_minutes: 120,
                    duration_minutes: 15,
                },
                BreakSlot {
                    offset_minutes: 270,
                    duration_minutes: 10,
                },
                BreakSlot {
                    offset_minutes: 390,
                    duration_minutes: 10,
                },
            ],
        }
    }
}
