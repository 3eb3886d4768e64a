use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use super::config::{BreakSlot, WeeklyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shift {
    Morning,
    Evening,
    Night,
}

impl Shift {
    pub fn start_time(&self) -> NaiveTime {
        let hour = match self {
            Shift::Morning => 6,
            Shift::Evening => 14,
            Shift::Night => 22,
        };
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()
    }

    /// Recommendation text shown to managers.
    pub fn label(&self) -> &'static str {
        match self {
            Shift::Morning => "Morning (06:00–14:00)",
            Shift::Evening => "Evening (14:00–22:00)",
            Shift::Night => "Night acceptable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestBreak {
    /// Clock time `HH:MM`.
    pub start: String,
    pub end: String,
    pub duration_min: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub risk_level: RiskLevel,
    pub recommended_shift: Shift,
    pub recommended_breaks: Vec<RestBreak>,
}

pub fn classify_risk(predicted_minutes: f64, config: &WeeklyConfig) -> RiskLevel {
    if predicted_minutes > config.high_risk_above {
        RiskLevel::High
    } else if predicted_minutes > config.moderate_risk_above {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Heavier predicted fatigue moves the worker onto an earlier shift.
pub fn recommend_shift(risk: RiskLevel) -> Shift {
    match risk {
        RiskLevel::High => Shift::Morning,
        RiskLevel::Moderate => Shift::Evening,
        RiskLevel::Low => Shift::Night,
    }
}

/// Break times wrap past midnight for the night shift.
pub fn generate_breaks(shift: Shift, slots: &[BreakSlot]) -> Vec<RestBreak> {
    let shift_start = shift.start_time();

    slots
        .iter()
        .map(|slot| {
            let (start, _) =
                shift_start.overflowing_add_signed(Duration::minutes(slot.offset_minutes));
            let (end, _) =
                start.overflowing_add_signed(Duration::minutes(i64::from(slot.duration_minutes)));
            RestBreak {
                start: start.format("%H:%M").to_string(),
                end: end.format("%H:%M").to_string(),
                duration_min: slot.duration_minutes,
            }
        })
        .collect()
}

pub fn decide(predicted_minutes: f64, config: &WeeklyConfig) -> Decision {
    let risk_level = classify_risk(predicted_minutes, config);
    let recommended_shift = recommend_shift(risk_level);
    Decision {
        risk_level,
        recommended_shift,
        recommended_breaks: generate_breaks(recommended_shift, &config.break_slots),
    }
}
