use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

use crate::sensing::classifier::FatigueLabel;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("failed to parse {field}"))
}

pub fn format_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn parse_label(value: &str) -> Result<FatigueLabel> {
    match value {
        "Normal" => Ok(FatigueLabel::Normal),
        "Stressed" => Ok(FatigueLabel::Stressed),
        "Fatigue" => Ok(FatigueLabel::Fatigue),
        "Error" => Ok(FatigueLabel::Error),
        other => Err(anyhow!("unknown fatigue label {other}")),
    }
}

/// Wraps a conversion error so it can leave a `query_map` closure.
pub fn conversion_error(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    )))
}
