use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::weekly::kpi::DailyKpi;

/// KPI aggregate for one worker on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyKpiRecord {
    pub worker_id: String,
    pub day: NaiveDate,
    pub kpi: DailyKpi,
}
