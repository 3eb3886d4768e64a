use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, NaiveDate};

use crate::{
    db::DailyKpiRecord,
    error::PipelineError,
    weekly::{mock_week, DailyKpi, WeeklyForecast},
    AppState,
};

/// Runs the weekly pipeline on the worker's last stored days.
pub async fn generate_weekly_report(
    state: &AppState,
    worker_id: String,
) -> Result<WeeklyForecast, String> {
    let days = state.weekly.config().days;
    let records = state
        .db
        .get_last_daily_kpis(&worker_id, days)
        .await
        .context("failed to load daily KPIs")
        .map_err(|e| format!("{e:#}"))?;

    if records.len() < days {
        return Err(PipelineError::InsufficientHistory {
            expected: days,
            actual: records.len(),
        }
        .to_string());
    }

    let kpis = records.into_iter().map(|r| r.kpi).collect();
    run_pipeline(state, worker_id, kpis).await
}

/// Runs the weekly pipeline on KPI records supplied by the caller, keyed by
/// field name.
pub async fn forecast_from_records(
    state: &AppState,
    worker_id: String,
    records: Vec<HashMap<String, f64>>,
) -> Result<WeeklyForecast, String> {
    let kpis = records
        .iter()
        .enumerate()
        .map(|(i, record)| DailyKpi::from_record(i + 1, record))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    run_pipeline(state, worker_id, kpis).await
}

pub async fn record_daily_kpi(
    state: &AppState,
    worker_id: String,
    day: NaiveDate,
    kpi: DailyKpi,
) -> Result<(), String> {
    // A single record has no position in a week; report it by date.
    kpi.validate(1).map_err(|e| match e {
        PipelineError::InvalidKpiValue { field, value, .. } => {
            format!("daily KPI field '{field}' for {worker_id} on {day} has invalid value {value}")
        }
        other => other.to_string(),
    })?;
    state
        .db
        .upsert_daily_kpi(&DailyKpiRecord { worker_id, day, kpi })
        .await
        .map_err(|e| e.to_string())
}

/// Stores the reference week so that it ends on `last_day`.
pub async fn seed_mock_week(
    state: &AppState,
    worker_id: String,
    last_day: NaiveDate,
) -> Result<Vec<DailyKpiRecord>, String> {
    let week = mock_week();
    let first_day = last_day - Duration::days(week.len() as i64 - 1);

    let mut seeded = Vec::with_capacity(week.len());
    for (offset, kpi) in week.into_iter().enumerate() {
        let record = DailyKpiRecord {
            worker_id: worker_id.clone(),
            day: first_day + Duration::days(offset as i64),
            kpi,
        };
        state
            .db
            .upsert_daily_kpi(&record)
            .await
            .map_err(|e| e.to_string())?;
        seeded.push(record);
    }

    Ok(seeded)
}

async fn run_pipeline(
    state: &AppState,
    worker_id: String,
    kpis: Vec<DailyKpi>,
) -> Result<WeeklyForecast, String> {
    let timeout = state.settings.get().inference_timeout();
    let forecast = state
        .weekly
        .run_with_timeout(worker_id, kpis, timeout)
        .await
        .map_err(|e| e.to_string())?;

    if forecast.degraded {
        log::warn!(
            "weekly forecast for {} used the fallback value",
            forecast.worker_id
        );
    }
    Ok(forecast)
}
