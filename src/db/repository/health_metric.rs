use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp, timestamp_column};
use crate::db::DatabaseError;
use crate::models::HealthMetric;

/// Row to append to a patient's health log.
#[derive(Debug, Clone, Default)]
pub struct NewHealthMetric {
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub cholesterol: Option<f64>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    pub bmi: f64,
}

const METRIC_COLUMNS: &str = "id, patient_id, weight, height, blood_sugar, cholesterol, \
                              bp_systolic, bp_diastolic, bmi, recorded_at";

pub fn insert_health_metric(
    conn: &Connection,
    patient_id: i64,
    metric: &NewHealthMetric,
    recorded_at: &NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO health_metrics
            (patient_id, weight, height, blood_sugar, cholesterol, bp_systolic, bp_diastolic, bmi, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            patient_id,
            metric.weight,
            metric.height,
            metric.blood_sugar,
            metric.cholesterol,
            metric.bp_systolic,
            metric.bp_diastolic,
            metric.bmi,
            format_timestamp(recorded_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent measurements first, at most `limit` rows.
pub fn get_health_metrics(
    conn: &Connection,
    patient_id: i64,
    limit: u32,
) -> Result<Vec<HealthMetric>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {METRIC_COLUMNS}
         FROM health_metrics
         WHERE patient_id = ?1
         ORDER BY recorded_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![patient_id, limit], row_to_health_metric)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_latest_health_metric(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<HealthMetric>, DatabaseError> {
    Ok(get_health_metrics(conn, patient_id, 1)?.into_iter().next())
}

/// Timestamp of the newest entry in a patient's log.
pub fn get_latest_recorded_at(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<NaiveDateTime>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT MAX(recorded_at) FROM health_metrics WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )
        .optional()?
        .flatten();
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn row_to_health_metric(row: &rusqlite::Row) -> Result<HealthMetric, rusqlite::Error> {
    Ok(HealthMetric {
        health_id: row.get(0)?,
        patient_id: row.get(1)?,
        weight: row.get(2)?,
        height: row.get(3)?,
        blood_sugar: row.get(4)?,
        cholesterol: row.get(5)?,
        bp_systolic: row.get(6)?,
        bp_diastolic: row.get(7)?,
        bmi: row.get(8)?,
        recorded_at: timestamp_column(row, 9)?,
    })
}
