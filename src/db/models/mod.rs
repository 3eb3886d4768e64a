pub mod classification;
pub mod daily_kpi;
pub mod reading;

pub use classification::ClassificationRecord;
pub use daily_kpi::DailyKpiRecord;
pub use reading::Reading;
