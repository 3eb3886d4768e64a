use anyhow::Result;
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::{conversion_error, parse_datetime},
    models::Reading,
};

impl Database {
    pub async fn insert_reading(&self, reading: &Reading) -> Result<i64> {
        let record = reading.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO readings (
                    helmet_id,
                    timestamp,
                    heart_rate,
                    body_temp,
                    env_temp,
                    pressure,
                    co_ppm,
                    ch4_ppm
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.helmet_id,
                    record.timestamp.to_rfc3339(),
                    record.heart_rate,
                    record.body_temp,
                    record.env_temp,
                    record.pressure,
                    record.co_ppm,
                    record.ch4_ppm,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Newest `limit` readings for a helmet, returned oldest first.
    pub async fn get_recent_readings(&self, helmet_id: &str, limit: usize) -> Result<Vec<Reading>> {
        let helmet_id = helmet_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    helmet_id,
                    timestamp,
                    heart_rate,
                    body_temp,
                    env_temp,
                    pressure,
                    co_ppm,
                    ch4_ppm
                FROM readings
                WHERE helmet_id = ?1
                ORDER BY id DESC
                LIMIT ?2",
            )?;

            let readings_iter = stmt.query_map(params![helmet_id, limit], |row| {
                let timestamp_str: String = row.get(2)?;
                let timestamp =
                    parse_datetime(&timestamp_str, "timestamp").map_err(conversion_error)?;

                Ok(Reading {
                    id: row.get(0)?,
                    helmet_id: row.get(1)?,
                    timestamp,
                    heart_rate: row.get(3)?,
                    body_temp: row.get(4)?,
                    env_temp: row.get(5)?,
                    pressure: row.get(6)?,
                    co_ppm: row.get(7)?,
                    ch4_ppm: row.get(8)?,
                })
            })?;

            let mut readings = Vec::new();
            for reading_result in readings_iter {
                readings.push(reading_result?);
            }
            readings.reverse();

            Ok(readings)
        })
        .await
    }

    pub async fn count_readings(&self, helmet_id: &str) -> Result<u64> {
        let helmet_id = helmet_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM readings WHERE helmet_id = ?1",
                params![helmet_id],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn reading(helmet_id: &str, offset_secs: i64, heart_rate: f64) -> Reading {
        Reading {
            id: None,
            helmet_id: helmet_id.to_string(),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            heart_rate,
            body_temp: 36.6,
            env_temp: Some(31.0),
            pressure: None,
            co_ppm: Some(1.3),
            ch4_ppm: Some(3.1),
        }
    }

    #[tokio::test]
    async fn recent_readings_are_scoped_and_chronological() {
        let db = Database::in_memory().unwrap();
        for i in 0..5 {
            db.insert_reading(&reading("H1", i, 150.0 + i as f64))
                .await
                .unwrap();
        }
        db.insert_reading(&reading("H2", 0, 99.0)).await.unwrap();

        let recent = db.get_recent_readings("H1", 3).await.unwrap();
        let rates: Vec<f64> = recent.iter().map(|r| r.heart_rate).collect();
        assert_eq!(rates, vec![152.0, 153.0, 154.0]);
        assert!(recent.iter().all(|r| r.id.is_some()));
        assert_eq!(recent[0].co_ppm, Some(1.3));
        assert_eq!(recent[0].pressure, None);

        assert_eq!(db.count_readings("H1").await.unwrap(), 5);
        assert_eq!(db.count_readings("H2").await.unwrap(), 1);
        assert_eq!(db.count_readings("H3").await.unwrap(), 0);
    }
}
