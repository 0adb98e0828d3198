//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed `Connection` so callers decide the
//! transaction boundary. All public functions are re-exported here.

mod appointment;
mod health_metric;
mod hospital;
mod patient;
mod user;

use chrono::NaiveDateTime;

use super::sqlite::TIMESTAMP_FORMAT;

pub use appointment::*;
pub use health_metric::*;
pub use hospital::*;
pub use patient::*;
pub use user::*;

/// Current UTC time truncated to the stored precision.
pub(crate) fn now_timestamp() -> NaiveDateTime {
    let now = chrono::Utc::now().naive_utc();
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Read a TEXT timestamp column, failing the row on an unparseable value.
pub(crate) fn timestamp_column(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<NaiveDateTime, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}
