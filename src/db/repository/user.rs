use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, now_timestamp, timestamp_column};
use crate::db::DatabaseError;
use crate::models::{Doctor, Role, User};

/// Fields needed to create a user row.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub role: Role,
    pub google_id: Option<&'a str>,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, google_id, created_at";

/// Insert a user and return its id. A duplicate email surfaces as a
/// UNIQUE constraint failure (see `DatabaseError::is_unique_violation`).
pub fn insert_user(conn: &Connection, user: &NewUser<'_>) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (name, email, password_hash, role, google_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.google_id,
            format_timestamp(&now_timestamp()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        row_to_user,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        row_to_user,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Find a user by external identity first, then by email.
pub fn find_user_by_google_id_or_email(
    conn: &Connection,
    google_id: &str,
    email: &str,
) -> Result<Option<User>, DatabaseError> {
    conn.query_row(
        &format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE google_id = ?1 OR email = ?2
             ORDER BY CASE WHEN google_id = ?1 THEN 0 ELSE 1 END
             LIMIT 1"
        ),
        params![google_id, email],
        row_to_user,
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Create the patient profile row for a user.
pub fn insert_patient(conn: &Connection, user_id: i64) -> Result<i64, DatabaseError> {
    conn.execute("INSERT INTO patients (user_id) VALUES (?1)", params![user_id])?;
    Ok(conn.last_insert_rowid())
}

/// Create the doctor profile row for a user.
pub fn insert_doctor(
    conn: &Connection,
    user_id: i64,
    specialization: &str,
    phone: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (user_id, specialization, phone) VALUES (?1, ?2, ?3)",
        params![user_id, specialization, phone],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Resolve a user's patient profile id.
pub fn find_patient_id_by_user(conn: &Connection, user_id: i64) -> Result<Option<i64>, DatabaseError> {
    conn.query_row(
        "SELECT id FROM patients WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Resolve a user's doctor profile id.
pub fn find_doctor_id_by_user(conn: &Connection, user_id: i64) -> Result<Option<i64>, DatabaseError> {
    conn.query_row(
        "SELECT id FROM doctors WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn get_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>, DatabaseError> {
    conn.query_row(
        "SELECT id, user_id, specialization, phone FROM doctors WHERE id = ?1",
        params![id],
        |row| {
            Ok(Doctor {
                id: row.get(0)?,
                user_id: row.get(1)?,
                specialization: row.get(2)?,
                phone: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(DatabaseError::from)
}

pub fn doctor_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn row_to_user(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let role_str: String = row.get(4)?;
    let role = Role::from_str(&role_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role,
        google_id: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
    })
}
