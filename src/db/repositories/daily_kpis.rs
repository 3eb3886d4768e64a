use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date},
    models::DailyKpiRecord,
};
use crate::weekly::kpi::DailyKpi;

fn row_to_daily_kpi(row: &Row) -> Result<DailyKpiRecord> {
    let day: String = row.get("day")?;

    Ok(DailyKpiRecord {
        worker_id: row.get("worker_id")?,
        day: parse_date(&day, "day")?,
        kpi: DailyKpi {
            fatigue_minutes: row.get("fatigue_minutes")?,
            avg_recovery_time: row.get("avg_recovery_time")?,
            co_exposure: row.get("co_exposure")?,
            heat_stress: row.get("heat_stress")?,
            avg_hr: row.get("avg_hr")?,
        },
    })
}

impl Database {
    /// Inserts or replaces the aggregate for `(worker_id, day)`.
    pub async fn upsert_daily_kpi(&self, record: &DailyKpiRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO daily_kpis (worker_id, day, fatigue_minutes, avg_recovery_time, co_exposure, heat_stress, avg_hr, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(worker_id, day) DO UPDATE SET
                     fatigue_minutes = excluded.fatigue_minutes,
                     avg_recovery_time = excluded.avg_recovery_time,
                     co_exposure = excluded.co_exposure,
                     heat_stress = excluded.heat_stress,
                     avg_hr = excluded.avg_hr,
                     updated_at = excluded.updated_at",
                params![
                    record.worker_id,
                    format_date(record.day),
                    record.kpi.fatigue_minutes,
                    record.kpi.avg_recovery_time,
                    record.kpi.co_exposure,
                    record.kpi.heat_stress,
                    record.kpi.avg_hr,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent `days` aggregates for a worker, oldest first.
    pub async fn get_last_daily_kpis(
        &self,
        worker_id: &str,
        days: usize,
    ) -> Result<Vec<DailyKpiRecord>> {
        let worker_id = worker_id.to_string();
        let limit = i64::try_from(days).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT worker_id, day, fatigue_minutes, avg_recovery_time, co_exposure, heat_stress, avg_hr
                 FROM daily_kpis
                 WHERE worker_id = ?1
                 ORDER BY day DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![worker_id, limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_daily_kpi(row)?);
            }
            records.reverse();

            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::weekly::kpi::mock_week;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn returns_last_days_in_calendar_order() {
        let db = Database::in_memory().unwrap();
        for (i, kpi) in mock_week().into_iter().enumerate() {
            db.upsert_daily_kpi(&DailyKpiRecord {
                worker_id: "W1024".into(),
                day: day(i as u32 + 1),
                kpi,
            })
            .await
            .unwrap();
        }

        let last = db.get_last_daily_kpis("W1024", 7).await.unwrap();
        let kpis: Vec<DailyKpi> = last.iter().map(|r| r.kpi).collect();
        assert_eq!(kpis, mock_week());
        assert_eq!(last[0].day, day(1));

        let last_three = db.get_last_daily_kpis("W1024", 3).await.unwrap();
        assert_eq!(last_three.len(), 3);
        assert_eq!(last_three[0].day, day(5));
        assert_eq!(last_three[2].kpi.fatigue_minutes, 83.0);

        assert!(db.get_last_daily_kpis("W0", 7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_day() {
        let db = Database::in_memory().unwrap();
        let mut record = DailyKpiRecord {
            worker_id: "W1".into(),
            day: day(10),
            kpi: mock_week()[0],
        };
        db.upsert_daily_kpi(&record).await.unwrap();
        record.kpi.fatigue_minutes = 99.0;
        db.upsert_daily_kpi(&record).await.unwrap();

        let stored = db.get_last_daily_kpis("W1", 7).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kpi.fatigue_minutes, 99.0);
    }
}
