//! Appointment scheduling: doctor search, booking, the doctor agenda and
//! the admin side of hospitals and weekly schedule slots.
//!
//! Double booking and overlapping slots are accepted.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{Appointment, DoctorAppointment, DoctorSearchFilter, DoctorSearchResult};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Patient profile not found")]
    PatientProfileNotFound,
    #[error("Doctor profile not found")]
    DoctorProfileNotFound,
    #[error("Doctor {0} not found")]
    DoctorNotFound(i64),
    #[error("Hospital {0} not found")]
    HospitalNotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: i64,
    pub hospital_id: i64,
    pub appointment_date: String,
    pub appointment_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHospital {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewScheduleSlot {
    pub doctor_id: i64,
    pub hospital_id: i64,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub fn find_doctors(
    conn: &Connection,
    filter: &DoctorSearchFilter,
) -> Result<Vec<DoctorSearchResult>, SchedulingError> {
    Ok(repository::search_doctors(conn, filter)?)
}

/// Book an appointment for the calling patient.
pub fn book(
    conn: &Connection,
    patient_user_id: i64,
    request: &BookingRequest,
) -> Result<Appointment, SchedulingError> {
    let patient_id = repository::find_patient_id_by_user(conn, patient_user_id)?
        .ok_or(SchedulingError::PatientProfileNotFound)?;

    let date = normalize_date(&request.appointment_date)?;
    let time = normalize_time("appointment_time", &request.appointment_time)?;

    if !repository::doctor_exists(conn, request.doctor_id)? {
        return Err(SchedulingError::DoctorNotFound(request.doctor_id));
    }
    if !repository::hospital_exists(conn, request.hospital_id)? {
        return Err(SchedulingError::HospitalNotFound(request.hospital_id));
    }

    let appointment = repository::insert_appointment(
        conn,
        patient_id,
        request.doctor_id,
        request.hospital_id,
        &date,
        &time,
    )?;

    tracing::info!(
        appointment_id = appointment.id,
        patient_id,
        doctor_id = request.doctor_id,
        "Appointment booked"
    );
    Ok(appointment)
}

/// The calling doctor's appointments, earliest first.
pub fn list_doctor_appointments(
    conn: &Connection,
    doctor_user_id: i64,
) -> Result<Vec<DoctorAppointment>, SchedulingError> {
    let doctor_id = repository::find_doctor_id_by_user(conn, doctor_user_id)?
        .ok_or(SchedulingError::DoctorProfileNotFound)?;
    Ok(repository::get_appointments_for_doctor(conn, doctor_id)?)
}

pub fn create_hospital(conn: &Connection, hospital: &NewHospital) -> Result<i64, SchedulingError> {
    let name = hospital.name.trim();
    if name.is_empty() {
        return Err(SchedulingError::Validation("name is required".into()));
    }
    let address = non_blank(hospital.address.as_deref());
    let phone = non_blank(hospital.phone.as_deref());

    let hospital_id = repository::insert_hospital(conn, name, address, phone)?;
    tracing::info!(hospital_id, "Hospital created");
    Ok(hospital_id)
}

/// Add a weekly working window for a doctor at a hospital.
pub fn add_schedule_slot(conn: &Connection, slot: &NewScheduleSlot) -> Result<i64, SchedulingError> {
    let day = normalize_weekday(&slot.day_of_week)?;
    let start = parse_time("start_time", &slot.start_time)?;
    let end = parse_time("end_time", &slot.end_time)?;
    if start >= end {
        return Err(SchedulingError::Validation(
            "start_time must be before end_time".into(),
        ));
    }

    if !repository::doctor_exists(conn, slot.doctor_id)? {
        return Err(SchedulingError::DoctorNotFound(slot.doctor_id));
    }
    if !repository::hospital_exists(conn, slot.hospital_id)? {
        return Err(SchedulingError::HospitalNotFound(slot.hospital_id));
    }

    let schedule_id = repository::insert_schedule_slot(
        conn,
        slot.doctor_id,
        slot.hospital_id,
        day,
        &start.format("%H:%M").to_string(),
        &end.format("%H:%M").to_string(),
    )?;
    tracing::info!(schedule_id, doctor_id = slot.doctor_id, "Schedule slot added");
    Ok(schedule_id)
}

// ═══════════════════════════════════════════
// Validation helpers
// ═══════════════════════════════════════════

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_weekday(raw: &str) -> Result<&'static str, SchedulingError> {
    let wanted = raw.trim();
    WEEKDAYS
        .iter()
        .find(|day| day.eq_ignore_ascii_case(wanted))
        .copied()
        .ok_or_else(|| {
            SchedulingError::Validation(format!(
                "day_of_week must be one of Monday..Sunday, got {wanted:?}"
            ))
        })
}

fn normalize_date(raw: &str) -> Result<String, SchedulingError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| {
            SchedulingError::Validation("appointment_date must be YYYY-MM-DD".into())
        })
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time(field: &str, raw: &str) -> Result<NaiveTime, SchedulingError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| SchedulingError::Validation(format!("{field} must be HH:MM")))
}

fn normalize_time(field: &str, raw: &str) -> Result<String, SchedulingError> {
    Ok(parse_time(field, raw)?.format("%H:%M").to_string())
}
