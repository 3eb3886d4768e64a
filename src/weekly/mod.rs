pub mod commands;
pub mod config;
pub mod decision;
pub mod features;
pub mod forecast;
pub mod kpi;
pub mod pipeline;
pub mod report;

pub use config::{BreakSlot, WeeklyConfig};
pub use decision::{Decision, RestBreak, RiskLevel, Shift};
pub use features::{extract, FeatureVector};
pub use forecast::{Forecast, WeeklyForecaster};
pub use kpi::{mock_week, DailyKpi, KpiField};
pub use pipeline::{WeeklyForecast, WeeklyPipeline};
