use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::Reading;
use crate::error::{PipelineError, PipelineResult};

use super::buffer::Sample;

const HEART_RATE_RANGE: (f64, f64) = (20.0, 250.0);
const BODY_TEMP_RANGE: (f64, f64) = (25.0, 45.0);

/// One telemetry packet as sent by a helmet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPacket {
    #[serde(default)]
    pub helmet_id: Option<String>,
    pub heart_rate: f64,
    pub body_temp: f64,
    #[serde(default)]
    pub env_temp: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub co_ppm: Option<f64>,
    #[serde(default)]
    pub ch4_ppm: Option<f64>,
}

impl SensorPacket {
    pub fn new(helmet_id: Option<String>, heart_rate: f64, body_temp: f64) -> Self {
        Self {
            helmet_id,
            heart_rate,
            body_temp,
            env_temp: None,
            pressure: None,
            co_ppm: None,
            ch4_ppm: None,
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if let Some(id) = &self.helmet_id {
            if id.trim().is_empty() {
                return Err(invalid("helmet_id", "must not be blank"));
            }
        }

        check_range("heart_rate", self.heart_rate, HEART_RATE_RANGE)?;
        check_range("body_temp", self.body_temp, BODY_TEMP_RANGE)?;

        check_optional("env_temp", self.env_temp, false)?;
        check_optional("pressure", self.pressure, true)?;
        check_optional("co_ppm", self.co_ppm, true)?;
        check_optional("ch4_ppm", self.ch4_ppm, true)?;

        Ok(())
    }

    /// The `(heart_rate, body_temp)` pair the classifier windows over.
    pub fn sample(&self) -> Sample {
        Sample::new(self.heart_rate as f32, self.body_temp as f32)
    }

    pub fn to_reading(&self, helmet_id: &str, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            id: None,
            helmet_id: helmet_id.to_string(),
            timestamp,
            heart_rate: self.heart_rate,
            body_temp: self.body_temp,
            env_temp: self.env_temp,
            pressure: self.pressure,
            co_ppm: self.co_ppm,
            ch4_ppm: self.ch4_ppm,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidPacket {
        field,
        reason: reason.into(),
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> PipelineResult<()> {
    if !value.is_finite() {
        return Err(invalid(field, "must be a finite number"));
    }
    if value < min || value > max {
        return Err(invalid(field, format!("{value} outside {min}..={max}")));
    }
    Ok(())
}

fn check_optional(field: &'static str, value: Option<f64>, non_negative: bool) -> PipelineResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(invalid(field, "must be a finite number")),
        Some(v) if non_negative && v < 0.0 => Err(invalid(field, format!("{v} is negative"))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet() -> SensorPacket {
        SensorPacket {
            helmet_id: Some("H-7".into()),
            heart_rate: 152.0,
            body_temp: 36.9,
            env_temp: Some(33.0),
            pressure: Some(1012.0),
            co_ppm: Some(1.3),
            ch4_ppm: Some(3.1),
        }
    }

    #[test]
    fn accepts_realistic_packet() {
        packet().validate().unwrap();
        SensorPacket::new(None, 72.0, 36.6).validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_vitals() {
        let mut p = packet();
        p.heart_rate = f64::NAN;
        assert!(matches!(
            p.validate(),
            Err(PipelineError::InvalidPacket { field: "heart_rate", .. })
        ));

        let mut p = packet();
        p.body_temp = 52.0;
        assert!(matches!(
            p.validate(),
            Err(PipelineError::InvalidPacket { field: "body_temp", .. })
        ));
    }

    #[test]
    fn rejects_negative_gas_and_blank_helmet() {
        let mut p = packet();
        p.co_ppm = Some(-0.1);
        assert!(matches!(
            p.validate(),
            Err(PipelineError::InvalidPacket { field: "co_ppm", .. })
        ));

        let mut p = packet();
        p.helmet_id = Some("  ".into());
        assert!(matches!(
            p.validate(),
            Err(PipelineError::InvalidPacket { field: "helmet_id", .. })
        ));
    }

    #[test]
    fn parses_packet_with_missing_optional_channels() {
        let p: SensorPacket =
            serde_json::from_str(r#"{"helmet_id":"H1","heart_rate":151,"body_temp":36.4}"#)
                .unwrap();
        assert_eq!(p.env_temp, None);
        assert_eq!(p.sample(), Sample::new(151.0, 36.4_f64 as f32));
    }
}
