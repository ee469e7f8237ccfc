//! Persistence seams for the entity store, the daily ledger and the audit log.
//!
//! Every backend implements all three traits; services only ever see an
//! `Arc<dyn AttendanceStore>`.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::model::{
    attendance::{DailyAttendanceRecord, LedgerRow, MarkMethod},
    attendance_log::{AttendanceLogEntry, NewLogEntry},
    student::{Student, StudentPatch, StudentProfile},
    teacher::{Teacher, TeacherProfile},
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert or refresh by code. The flag is true when a new row was created.
    async fn upsert_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> StoreResult<(Student, bool)>;

    async fn upsert_teacher(
        &self,
        code: &str,
        profile: &TeacherProfile,
    ) -> StoreResult<(Teacher, bool)>;

    /// Looks up by code regardless of the active flag.
    async fn find_student(&self, code: &str) -> StoreResult<Option<Student>>;

    async fn find_teacher(&self, code: &str) -> StoreResult<Option<Teacher>>;

    /// Active students ordered by last name, first name, code.
    async fn list_active_students(&self) -> StoreResult<Vec<Student>>;

    async fn count_active_students(&self) -> StoreResult<i64>;

    /// Returns `None` when no student has this code.
    async fn update_student(
        &self,
        code: &str,
        patch: &StudentPatch,
    ) -> StoreResult<Option<Student>>;

    /// Returns false when no student has this code.
    async fn set_student_active(&self, code: &str, active: bool) -> StoreResult<bool>;
}

/// A request to flip today's ledger row to present.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceMark {
    pub student_id: u64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub teacher_id: Option<u64>,
    /// Tag written to the audit log; the ledger stores `method.ledger_method()`.
    pub method: MarkMethod,
    pub raw_payload: Option<String>,
    pub message: String,
}

impl PresenceMark {
    pub fn success_entry(&self) -> NewLogEntry {
        NewLogEntry {
            student_id: self.student_id,
            teacher_id: self.teacher_id,
            log_date: self.date,
            log_time: self.time,
            method: self.method,
            raw_payload: self.raw_payload.clone(),
            success: true,
            message: self.message.clone(),
        }
    }

    pub fn failure_entry(&self, message: impl Into<String>) -> NewLogEntry {
        NewLogEntry {
            success: false,
            message: message.into(),
            ..self.success_entry()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    /// The row went from absent to present and the success entry was appended.
    Marked(DailyAttendanceRecord),
    /// The row was already present; nothing was written.
    AlreadyPresent(DailyAttendanceRecord),
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Fetch-or-create the (student, date) row and mark it present if it is not
    /// already. Runs as one atomic unit per key; on `Marked` the success audit
    /// entry is written inside the same unit.
    async fn mark_present(&self, mark: &PresenceMark) -> StoreResult<LedgerOutcome>;

    async fn find_record(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyAttendanceRecord>>;

    /// Rows for one date, ordered by student last name, first name, code.
    async fn records_for_date(&self, date: NaiveDate) -> StoreResult<Vec<LedgerRow>>;

    /// Newest first.
    async fn records_for_student(&self, student_id: u64)
    -> StoreResult<Vec<DailyAttendanceRecord>>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &NewLogEntry) -> StoreResult<AttendanceLogEntry>;

    /// Newest first.
    async fn entries_for_student(&self, student_id: u64) -> StoreResult<Vec<AttendanceLogEntry>>;
}

pub trait AttendanceStore: EntityStore + AttendanceLedger + AuditLog {}

impl<T> AttendanceStore for T where T: EntityStore + AttendanceLedger + AuditLog {}
