//! Health-metrics recorder.
//!
//! Every entry is owned by a patient profile and is append-only. The
//! caller's patient profile is resolved before anything is written, and
//! `recorded_at` is strictly increasing per patient so "latest" is never
//! ambiguous.

use chrono::{Duration, NaiveDateTime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::repository::{self, NewHealthMetric};
use crate::db::DatabaseError;
use crate::models::HealthMetric;

/// Maximum number of entries returned by [`list`].
pub const HISTORY_LIMIT: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum HealthMetricError {
    #[error("Patient profile not found")]
    ProfileNotFound,
    #[error("Patient {0} not found")]
    PatientNotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for HealthMetricError {
    fn from(err: rusqlite::Error) -> Self {
        HealthMetricError::Database(err.into())
    }
}

/// One set of measurements. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Measurement {
    pub weight: Option<f64>,
    /// Centimetres.
    pub height: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub cholesterol: Option<f64>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
}

impl Measurement {
    fn fields(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("weight", self.weight),
            ("height", self.height),
            ("blood_sugar", self.blood_sugar),
            ("cholesterol", self.cholesterol),
            ("bp_systolic", self.bp_systolic),
            ("bp_diastolic", self.bp_diastolic),
        ]
    }

    pub fn validate(&self) -> Result<(), HealthMetricError> {
        for (field, value) in self.fields() {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(HealthMetricError::Validation(format!(
                        "{field} must be a non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Older body shape: blood pressure as a single `"120/80"` string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyMeasurement {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub cholesterol: Option<f64>,
    pub blood_pressure: Option<String>,
}

impl LegacyMeasurement {
    pub fn into_measurement(self) -> Result<Measurement, HealthMetricError> {
        let (bp_systolic, bp_diastolic) = match self.blood_pressure.as_deref().map(str::trim) {
            None | Some("") => (None, None),
            Some(raw) => {
                let (sys, dia) = parse_blood_pressure(raw)?;
                (Some(sys), Some(dia))
            }
        };
        Ok(Measurement {
            weight: self.weight,
            height: self.height,
            blood_sugar: self.blood_sugar,
            cholesterol: self.cholesterol,
            bp_systolic,
            bp_diastolic,
        })
    }
}

fn parse_blood_pressure(raw: &str) -> Result<(f64, f64), HealthMetricError> {
    let invalid = || {
        HealthMetricError::Validation(format!(
            "blood_pressure must look like \"120/80\", got {raw:?}"
        ))
    };
    let (sys, dia) = raw.split_once('/').ok_or_else(invalid)?;
    let sys: f64 = sys.trim().parse().map_err(|_| invalid())?;
    let dia: f64 = dia.trim().parse().map_err(|_| invalid())?;
    Ok((sys, dia))
}

/// BMI from kilograms and centimetres, rounded to one decimal.
/// Returns `0.0` when either value is missing or height is not positive.
pub fn compute_bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> f64 {
    match (weight_kg, height_cm) {
        (Some(w), Some(h)) if h > 0.0 && w.is_finite() && h.is_finite() => {
            let meters = h / 100.0;
            ((w / (meters * meters)) * 10.0).round() / 10.0
        }
        _ => 0.0,
    }
}

/// Patient profile id for an authenticated user.
pub fn resolve_patient(conn: &Connection, user_id: i64) -> Result<i64, HealthMetricError> {
    repository::find_patient_id_by_user(conn, user_id)?.ok_or(HealthMetricError::ProfileNotFound)
}

/// Append a measurement to the caller's log and return the stored row.
pub fn record(
    conn: &Connection,
    owner_user_id: i64,
    measurement: &Measurement,
) -> Result<HealthMetric, HealthMetricError> {
    let patient_id = resolve_patient(conn, owner_user_id)?;
    measurement.validate()?;

    let new_metric = NewHealthMetric {
        weight: measurement.weight,
        height: measurement.height,
        blood_sugar: measurement.blood_sugar,
        cholesterol: measurement.cholesterol,
        bp_systolic: measurement.bp_systolic,
        bp_diastolic: measurement.bp_diastolic,
        bmi: compute_bmi(measurement.weight, measurement.height),
    };

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let recorded_at = next_recorded_at(
        repository::now_timestamp(),
        repository::get_latest_recorded_at(&tx, patient_id)?,
    );
    let health_id = repository::insert_health_metric(&tx, patient_id, &new_metric, &recorded_at)?;
    tx.commit()?;

    tracing::debug!(patient_id, health_id, bmi = new_metric.bmi, "Health metric recorded");

    Ok(HealthMetric {
        health_id,
        patient_id,
        weight: new_metric.weight,
        height: new_metric.height,
        blood_sugar: new_metric.blood_sugar,
        cholesterol: new_metric.cholesterol,
        bp_systolic: new_metric.bp_systolic,
        bp_diastolic: new_metric.bp_diastolic,
        bmi: new_metric.bmi,
        recorded_at,
    })
}

fn next_recorded_at(now: NaiveDateTime, last: Option<NaiveDateTime>) -> NaiveDateTime {
    match last {
        Some(last) if last >= now => last + Duration::microseconds(1),
        _ => now,
    }
}

/// Most recent entries first, at most [`HISTORY_LIMIT`].
pub fn list(conn: &Connection, owner_user_id: i64) -> Result<Vec<HealthMetric>, HealthMetricError> {
    let patient_id = resolve_patient(conn, owner_user_id)?;
    Ok(repository::get_health_metrics(conn, patient_id, HISTORY_LIMIT)?)
}

pub fn latest(conn: &Connection, owner_user_id: i64) -> Result<Option<HealthMetric>, HealthMetricError> {
    let patient_id = resolve_patient(conn, owner_user_id)?;
    Ok(repository::get_latest_health_metric(conn, patient_id)?)
}

/// What a doctor sees when looking a patient up.
#[derive(Debug, Clone, Serialize)]
pub struct PatientOverview {
    pub patient_id: i64,
    pub name: String,
    pub email: String,
    pub latest_metrics: Option<HealthMetric>,
    pub report_summaries: Vec<String>,
}

pub fn patient_overview(conn: &Connection, patient_id: i64) -> Result<PatientOverview, HealthMetricError> {
    let identity = repository::get_patient_identity(conn, patient_id)?
        .ok_or(HealthMetricError::PatientNotFound(patient_id))?;
    let latest_metrics = repository::get_latest_health_metric(conn, patient_id)?;
    let report_summaries = repository::get_report_summaries(conn, patient_id)?;

    Ok(PatientOverview {
        patient_id: identity.patient_id,
        name: identity.name,
        email: identity.email,
        latest_metrics,
        report_summaries,
    })
}
