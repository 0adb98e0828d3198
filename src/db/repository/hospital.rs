use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{Hospital, ScheduleSlot};

pub fn insert_hospital(
    conn: &Connection,
    name: &str,
    address: Option<&str>,
    phone: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO hospitals (name, address, phone) VALUES (?1, ?2, ?3)",
        params![name, address, phone],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_hospital(conn: &Connection, id: i64) -> Result<Option<Hospital>, DatabaseError> {
    conn.query_row(
        "SELECT id, name, address, phone FROM hospitals WHERE id = ?1",
        params![id],
        |row| {
            Ok(Hospital {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                phone: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn hospital_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM hospitals WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Insert a weekly slot. Overlapping slots are accepted.
pub fn insert_schedule_slot(
    conn: &Connection,
    doctor_id: i64,
    hospital_id: i64,
    day_of_week: &str,
    start_time: &str,
    end_time: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO doctor_hospital_schedule (doctor_id, hospital_id, day_of_week, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![doctor_id, hospital_id, day_of_week, start_time, end_time],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_schedule_for_doctor(
    conn: &Connection,
    doctor_id: i64,
) -> Result<Vec<ScheduleSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, doctor_id, hospital_id, day_of_week, start_time, end_time
         FROM doctor_hospital_schedule
         WHERE doctor_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt.query_map(params![doctor_id], row_to_slot)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub(crate) fn row_to_slot(row: &rusqlite::Row) -> Result<ScheduleSlot, rusqlite::Error> {
    Ok(ScheduleSlot {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        hospital_id: row.get(2)?,
        day_of_week: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
    })
}
