use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_label},
    models::ClassificationRecord,
};

fn row_to_classification(row: &Row) -> Result<ClassificationRecord> {
    let timestamp: String = row.get("timestamp")?;
    let label: String = row.get("label")?;
    let confidence: f64 = row.get("confidence")?;
    let scores_json: String = row.get("scores_json")?;
    let degraded: i64 = row.get("degraded")?;

    Ok(ClassificationRecord {
        id: row.get("id")?,
        helmet_id: row.get("helmet_id")?,
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        label: parse_label(&label)?,
        confidence: confidence as f32,
        scores: serde_json::from_str(&scores_json).context("failed to parse scores_json")?,
        degraded: degraded != 0,
    })
}

impl Database {
    pub async fn insert_classification(&self, record: &ClassificationRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let scores_json =
                serde_json::to_string(&record.scores).context("failed to serialize scores")?;
            conn.execute(
                "INSERT INTO classifications (id, helmet_id, session_id, timestamp, label, confidence, scores_json, degraded)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.helmet_id,
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    record.label.as_str(),
                    f64::from(record.confidence),
                    scores_json,
                    record.degraded as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_latest_classification(
        &self,
        helmet_id: &str,
    ) -> Result<Option<ClassificationRecord>> {
        let helmet_id = helmet_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, helmet_id, session_id, timestamp, label, confidence, scores_json, degraded
                 FROM classifications
                 WHERE helmet_id = ?1
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT 1",
            )?;

            let record = stmt
                .query_row(params![helmet_id], |row| Ok(row_to_classification(row)))
                .optional()?;

            record.transpose()
        })
        .await
    }

    pub async fn get_session_classifications(
        &self,
        session_id: &str,
    ) -> Result<Vec<ClassificationRecord>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, helmet_id, session_id, timestamp, label, confidence, scores_json, degraded
                 FROM classifications
                 WHERE session_id = ?1
                 ORDER BY timestamp ASC, rowid ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_classification(row)?);
            }

            Ok(records)
        })
        .await
    }
}
