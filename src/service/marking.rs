use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use super::{Clock, payload::decode_student_code};
use crate::error::AppError;
use crate::model::{
    attendance::{DailyAttendanceRecord, MarkMethod},
    student::Student,
};
use crate::store::{AttendanceStore, LedgerOutcome, PresenceMark, StoreError};

pub const MARKED_MESSAGE: &str = "Attendance marked successfully";
pub const ALREADY_MARKED_MESSAGE: &str = "Already marked present today!";
const STUDENT_NOT_FOUND: &str = "Student ID not found in database.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkStatus {
    /// Absent → present on this call.
    Marked,
    /// The student was already present; informational only.
    AlreadyMarked,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StudentSummary {
    #[schema(example = "Maria Santos")]
    pub name: String,
    #[schema(example = "2024001")]
    pub id: String,
    #[schema(example = "BSIT - 2")]
    pub course_level: String,
    #[schema(example = "08:01:15", value_type = Option<String>)]
    pub time_marked: Option<NaiveTime>,
}

impl StudentSummary {
    fn new(student: &Student, record: &DailyAttendanceRecord) -> Self {
        Self {
            name: student.full_name(),
            id: student.student_code.clone(),
            course_level: student.course_level(),
            time_marked: record.time_marked,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkResult {
    pub status: MarkStatus,
    pub student: StudentSummary,
    pub record: DailyAttendanceRecord,
}

impl MarkResult {
    pub fn message(&self) -> &'static str {
        match self.status {
            MarkStatus::Marked => MARKED_MESSAGE,
            MarkStatus::AlreadyMarked => ALREADY_MARKED_MESSAGE,
        }
    }
}

#[derive(Debug)]
pub struct BulkItem {
    pub qr_data: String,
    pub outcome: Result<MarkResult, AppError>,
}

/// Drives the absent → present transition for one student and day.
#[derive(Clone)]
pub struct MarkingService {
    store: Arc<dyn AttendanceStore>,
    clock: Clock,
}

impl MarkingService {
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)().date()
    }

    /// Marks the student encoded in a scanned QR payload as present today.
    pub async fn mark_attendance(
        &self,
        scanned_payload: &str,
        teacher_code: Option<&str>,
    ) -> Result<MarkResult, AppError> {
        self.mark_scanned(scanned_payload, teacher_code, MarkMethod::Scan)
            .await
    }

    /// Same as [`mark_attendance`](Self::mark_attendance) with an explicit
    /// audit tag; bulk uploads come through here with `MarkMethod::Bulk`.
    #[instrument(name = "mark_scanned", skip(self, scanned_payload, method), fields(method = %method))]
    pub async fn mark_scanned(
        &self,
        scanned_payload: &str,
        teacher_code: Option<&str>,
        method: MarkMethod,
    ) -> Result<MarkResult, AppError> {
        let code = decode_student_code(scanned_payload).inspect_err(|_| {
            warn!(payload = scanned_payload, "Undecodable QR payload");
        })?;
        let student = self.resolve_student(&code).await?;
        self.record_presence(&student, teacher_code, method, Some(scanned_payload))
            .await
    }

    /// A teacher marking a student by hand, without a scan.
    #[instrument(name = "mark_manual", skip(self))]
    pub async fn mark_manual(
        &self,
        student_code: &str,
        teacher_code: Option<&str>,
    ) -> Result<MarkResult, AppError> {
        let code = student_code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("student_id is required".into()));
        }
        let student = self.resolve_student(code).await?;
        self.record_presence(&student, teacher_code, MarkMethod::Manual, None)
            .await
    }

    /// Marks each payload in turn as a bulk upload. Items fail independently.
    pub async fn mark_bulk(
        &self,
        payloads: &[String],
        teacher_code: Option<&str>,
        max_items: usize,
    ) -> Result<Vec<BulkItem>, AppError> {
        if payloads.is_empty() {
            return Err(AppError::Validation("qr_data must not be empty".into()));
        }
        if payloads.len() > max_items {
            return Err(AppError::Validation(format!(
                "At most {} items per upload",
                max_items
            )));
        }

        let mut items = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let outcome = self
                .mark_scanned(payload, teacher_code, MarkMethod::Bulk)
                .await;
            items.push(BulkItem {
                qr_data: payload.clone(),
                outcome,
            });
        }

        let marked = items
            .iter()
            .filter(|i| matches!(&i.outcome, Ok(r) if r.status == MarkStatus::Marked))
            .count();
        info!(items = items.len(), marked, "Bulk upload processed");
        Ok(items)
    }

    async fn resolve_student(&self, code: &str) -> Result<Student, AppError> {
        match self.store.find_student(code).await {
            Ok(Some(student)) if student.is_active => Ok(student),
            Ok(_) => {
                info!(student_code = code, "Marking attempt for unknown student");
                Err(AppError::NotFound(STUDENT_NOT_FOUND.into()))
            }
            Err(e) => {
                // No student resolved, so there is nothing to audit against.
                error!(error = %e, student_code = code, "Student lookup failed");
                Err(AppError::MarkingFailed(e.to_string()))
            }
        }
    }

    async fn resolve_teacher(&self, teacher_code: Option<&str>) -> Result<Option<u64>, StoreError> {
        let Some(code) = teacher_code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let teacher = self.store.find_teacher(code).await?;
        match teacher {
            Some(t) if t.is_active => Ok(Some(t.id)),
            _ => {
                info!(teacher_code = code, "Unknown teacher, marking without one");
                Ok(None)
            }
        }
    }

    async fn record_presence(
        &self,
        student: &Student,
        teacher_code: Option<&str>,
        method: MarkMethod,
        raw_payload: Option<&str>,
    ) -> Result<MarkResult, AppError> {
        let now = (self.clock)();
        let time = now.time().with_nanosecond(0).unwrap_or(now.time());
        let mut mark = PresenceMark {
            student_id: student.id,
            date: now.date(),
            time,
            teacher_id: None,
            method,
            raw_payload: raw_payload.map(str::to_string),
            message: MARKED_MESSAGE.to_string(),
        };

        let teacher_id = match self.resolve_teacher(teacher_code).await {
            Ok(id) => id,
            Err(e) => return Err(self.audit_failure(&mark, e).await),
        };
        mark.teacher_id = teacher_id;

        let outcome = match self.store.mark_present(&mark).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.audit_failure(&mark, e).await),
        };

        let (status, record) = match outcome {
            LedgerOutcome::Marked(record) => {
                info!(
                    student_code = %student.student_code,
                    teacher_id = ?mark.teacher_id,
                    time = %time,
                    "Student marked present"
                );
                (MarkStatus::Marked, record)
            }
            LedgerOutcome::AlreadyPresent(record) => {
                info!(student_code = %student.student_code, "Student already marked today");
                (MarkStatus::AlreadyMarked, record)
            }
        };

        Ok(MarkResult {
            status,
            student: StudentSummary::new(student, &record),
            record,
        })
    }

    /// Appends the failure entry best-effort and returns the original error.
    async fn audit_failure(&self, mark: &PresenceMark, cause: StoreError) -> AppError {
        let message = cause.to_string();
        error!(error = %cause, student_id = mark.student_id, "Marking attendance failed");

        if let Err(log_err) = self.store.append(&mark.failure_entry(&message)).await {
            warn!(error = %log_err, student_id = mark.student_id, "Could not audit failed marking");
        }
        AppError::MarkingFailed(message)
    }
}
