use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{format_timestamp, now_timestamp, timestamp_column};
use crate::db::DatabaseError;
use crate::models::{
    Appointment, DoctorAppointment, DoctorSearchFilter, DoctorSearchResult, HospitalRef,
};

/// Insert an appointment. No conflict check: the same doctor, hospital,
/// date and time may be booked any number of times.
pub fn insert_appointment(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    hospital_id: i64,
    appointment_date: &str,
    appointment_time: &str,
) -> Result<Appointment, DatabaseError> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, hospital_id, appointment_date, appointment_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient_id,
            doctor_id,
            hospital_id,
            appointment_date,
            appointment_time,
            format_timestamp(&created_at),
        ],
    )?;

    Ok(Appointment {
        id: conn.last_insert_rowid(),
        patient_id,
        doctor_id,
        hospital_id,
        appointment_date: appointment_date.to_string(),
        appointment_time: appointment_time.to_string(),
        created_at,
    })
}

pub fn get_appointment(conn: &Connection, id: i64) -> Result<Option<Appointment>, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, doctor_id, hospital_id, appointment_date, appointment_time, created_at
         FROM appointments WHERE id = ?1",
        params![id],
        row_to_appointment,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
    Ok(count)
}

/// A doctor's agenda, earliest first, with patient and hospital names.
pub fn get_appointments_for_doctor(
    conn: &Connection,
    doctor_id: i64,
) -> Result<Vec<DoctorAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.patient_id, a.doctor_id, a.hospital_id, a.appointment_date,
                a.appointment_time, a.created_at, u.name, h.name
         FROM appointments a
         JOIN patients p ON p.id = a.patient_id
         JOIN users u ON u.id = p.user_id
         JOIN hospitals h ON h.id = a.hospital_id
         WHERE a.doctor_id = ?1
         ORDER BY a.appointment_date ASC, a.appointment_time ASC, a.id ASC",
    )?;
    let rows = stmt.query_map(params![doctor_id], |row| {
        Ok(DoctorAppointment {
            appointment: row_to_appointment(row)?,
            patient_name: row.get(7)?,
            hospital_name: row.get(8)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Search doctors by optional name / hospital / specialization.
///
/// Each supplied filter contributes one predicate and one bound value;
/// caller text never reaches the SQL string. Name filters compare
/// Unicode-lowercased text on both sides, since SQLite's `LIKE` only folds
/// ASCII. Rows come back one per
/// schedule slot and are folded into one result per doctor.
pub fn search_doctors(
    conn: &Connection,
    filter: &DoctorSearchFilter,
) -> Result<Vec<DoctorSearchResult>, DatabaseError> {
    let predicates: Vec<(&str, String)> = [
        filter
            .name()
            .map(|v| ("unicode_lower(u.name) LIKE ? ESCAPE '\\'", like_pattern(v))),
        filter
            .hospital()
            .map(|v| ("unicode_lower(h.name) LIKE ? ESCAPE '\\'", like_pattern(v))),
        filter
            .specialization()
            .map(|v| ("d.specialization = ?", v.to_string())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let mut sql = String::from(
        "SELECT d.id, u.name, d.specialization, h.id, h.name,
                s.day_of_week, s.start_time, s.end_time
         FROM doctors d
         JOIN users u ON u.id = d.user_id
         JOIN doctor_hospital_schedule s ON s.doctor_id = d.id
         JOIN hospitals h ON h.id = s.hospital_id
         WHERE 1=1",
    );
    for (clause, _) in &predicates {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    sql.push_str(" ORDER BY d.id, s.id");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(predicates.iter().map(|(_, value)| value)))?;

    let mut results: Vec<DoctorSearchResult> = Vec::new();
    while let Some(row) = rows.next()? {
        let doctor_id: i64 = row.get(0)?;
        let hospital = HospitalRef {
            id: row.get(3)?,
            name: row.get(4)?,
        };
        let slot = format!(
            "{} {}-{}",
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        );

        match results.last_mut() {
            Some(current) if current.doctor_id == doctor_id => {
                if !current.hospitals.contains(&hospital) {
                    current.hospitals.push(hospital);
                }
                current.slots.push(slot);
            }
            _ => results.push(DoctorSearchResult {
                doctor_id,
                doctor_name: row.get(1)?,
                specialization: row.get(2)?,
                hospitals: vec![hospital],
                slots: vec![slot],
            }),
        }
    }

    Ok(results)
}

/// Lowercased substring pattern for a name filter.
fn like_pattern(value: &str) -> String {
    format!("%{}%", escape_like(&value.to_lowercase()))
}

/// Escape LIKE wildcards so caller input matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn row_to_appointment(row: &rusqlite::Row) -> Result<Appointment, rusqlite::Error> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        hospital_id: row.get(3)?,
        appointment_date: row.get(4)?,
        appointment_time: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}
