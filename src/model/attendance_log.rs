use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::attendance::MarkMethod;

/// Append-only audit row for a marking attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceLogEntry {
    pub id: u64,
    pub student_id: u64,
    pub teacher_id: Option<u64>,
    pub log_date: NaiveDate,
    pub log_time: NaiveTime,
    pub method: MarkMethod,
    pub raw_payload: Option<String>,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub student_id: u64,
    pub teacher_id: Option<u64>,
    pub log_date: NaiveDate,
    pub log_time: NaiveTime,
    pub method: MarkMethod,
    pub raw_payload: Option<String>,
    pub success: bool,
    pub message: String,
}
