use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::db::DatabaseError;

/// Patient profile joined with its owning user.
#[derive(Debug, Clone, Serialize)]
pub struct PatientIdentity {
    pub patient_id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
}

pub fn get_patient_identity(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<PatientIdentity>, DatabaseError> {
    conn.query_row(
        "SELECT p.id, u.id, u.name, u.email
         FROM patients p
         JOIN users u ON u.id = p.user_id
         WHERE p.id = ?1",
        params![patient_id],
        |row| {
            Ok(PatientIdentity {
                patient_id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                email: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// AI summaries of a patient's medical reports, oldest first. Reports
/// without a summary are skipped.
pub fn get_report_summaries(conn: &Connection, patient_id: i64) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT ai_summary FROM medical_reports
         WHERE patient_id = ?1 AND ai_summary IS NOT NULL
         ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| row.get::<_, String>(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}
