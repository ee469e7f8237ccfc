use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::Clock;
use crate::model::{
    attendance::{DailyAttendanceRecord, LedgerRow},
    attendance_log::{AttendanceLogEntry, NewLogEntry},
    student::{Student, StudentPatch, StudentProfile},
    teacher::{Teacher, TeacherProfile},
};
use crate::store::{
    AttendanceLedger, AttendanceStore, AuditLog, EntityStore, LedgerOutcome, PresenceMark,
    StoreError, StoreResult, memory::MemoryStore,
};

pub fn memory_store() -> Arc<dyn AttendanceStore> {
    Arc::new(MemoryStore::new())
}

pub fn student_profile(first: &str, last: &str) -> StudentProfile {
    StudentProfile {
        first_name: first.into(),
        last_name: last.into(),
        course: "BSIT".into(),
        level: "1".into(),
    }
}

pub fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, s).unwrap()
}

pub fn school_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn fixed_clock(now: NaiveDateTime) -> Clock {
    Arc::new(move || now)
}

/// Wraps a `MemoryStore` and fails selected operations on demand.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_ledger: AtomicBool,
    pub fail_audit: AtomicBool,
    pub fail_teacher_lookup: AtomicBool,
}

impl FailingStore {
    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{} offline", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EntityStore for FailingStore {
    async fn upsert_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> StoreResult<(Student, bool)> {
        self.inner.upsert_student(code, profile).await
    }

    async fn upsert_teacher(
        &self,
        code: &str,
        profile: &TeacherProfile,
    ) -> StoreResult<(Teacher, bool)> {
        self.inner.upsert_teacher(code, profile).await
    }

    async fn find_student(&self, code: &str) -> StoreResult<Option<Student>> {
        self.inner.find_student(code).await
    }

    async fn find_teacher(&self, code: &str) -> StoreResult<Option<Teacher>> {
        Self::check(&self.fail_teacher_lookup, "teacher table")?;
        self.inner.find_teacher(code).await
    }

    async fn list_active_students(&self) -> StoreResult<Vec<Student>> {
        self.inner.list_active_students().await
    }

    async fn count_active_students(&self) -> StoreResult<i64> {
        self.inner.count_active_students().await
    }

    async fn update_student(
        &self,
        code: &str,
        patch: &StudentPatch,
    ) -> StoreResult<Option<Student>> {
        self.inner.update_student(code, patch).await
    }

    async fn set_student_active(&self, code: &str, active: bool) -> StoreResult<bool> {
        self.inner.set_student_active(code, active).await
    }
}

#[async_trait]
impl AttendanceLedger for FailingStore {
    async fn mark_present(&self, mark: &PresenceMark) -> StoreResult<LedgerOutcome> {
        Self::check(&self.fail_ledger, "ledger")?;
        self.inner.mark_present(mark).await
    }

    async fn find_record(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyAttendanceRecord>> {
        self.inner.find_record(student_id, date).await
    }

    async fn records_for_date(&self, date: NaiveDate) -> StoreResult<Vec<LedgerRow>> {
        self.inner.records_for_date(date).await
    }

    async fn records_for_student(
        &self,
        student_id: u64,
    ) -> StoreResult<Vec<DailyAttendanceRecord>> {
        self.inner.records_for_student(student_id).await
    }
}

#[async_trait]
impl AuditLog for FailingStore {
    async fn append(&self, entry: &NewLogEntry) -> StoreResult<AttendanceLogEntry> {
        Self::check(&self.fail_audit, "audit log")?;
        self.inner.append(entry).await
    }

    async fn entries_for_student(&self, student_id: u64) -> StoreResult<Vec<AttendanceLogEntry>> {
        self.inner.entries_for_student(student_id).await
    }
}
