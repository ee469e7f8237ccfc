use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// How an attendance mark was produced. Stored lowercase in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkMethod {
    Scan,
    Manual,
    Bulk,
}

impl MarkMethod {
    /// The ledger only distinguishes scanned from manual marks; bulk uploads
    /// are decoded scans and land in the ledger as such.
    pub fn ledger_method(self) -> MarkMethod {
        match self {
            MarkMethod::Manual => MarkMethod::Manual,
            MarkMethod::Scan | MarkMethod::Bulk => MarkMethod::Scan,
        }
    }
}

/// One row per (student, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAttendanceRecord {
    pub id: u64,
    pub student_id: u64,
    pub attendance_date: NaiveDate,
    pub is_present: bool,
    pub time_marked: Option<NaiveTime>,
    pub method: MarkMethod,
    pub teacher_id: Option<u64>,
}

/// A ledger record joined with the student and teacher it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub record: DailyAttendanceRecord,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub course: String,
    pub level: String,
    pub student_active: bool,
    pub teacher_code: Option<String>,
}

impl LedgerRow {
    pub fn student_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn course_level(&self) -> String {
        format!("{} - {}", self.course, self.level)
    }
}
