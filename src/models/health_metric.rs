use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One append-only health snapshot owned by a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthMetric {
    pub health_id: i64,
    pub patient_id: i64,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub cholesterol: Option<f64>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    pub bmi: f64,
    pub recorded_at: NaiveDateTime,
}
