use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Weekly recurring window during which a doctor works at a hospital.
/// Times are stored as `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: i64,
    pub doctor_id: i64,
    pub hospital_id: i64,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

impl ScheduleSlot {
    /// `"<day> <start>-<end>"`, the format used in doctor search results.
    pub fn label(&self) -> String {
        format!("{} {}-{}", self.day_of_week, self.start_time, self.end_time)
    }
}
