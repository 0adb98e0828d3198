use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub hospital_id: i64,
    pub appointment_date: String, // YYYY-MM-DD
    pub appointment_time: String, // HH:MM
    pub created_at: NaiveDateTime,
}

/// Appointment row as seen on the doctor's agenda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub hospital_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalRef {
    pub id: i64,
    pub name: String,
}

/// One doctor with every matching schedule slot folded into a single row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSearchResult {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub specialization: String,
    pub hospitals: Vec<HospitalRef>,
    pub slots: Vec<String>,
}
