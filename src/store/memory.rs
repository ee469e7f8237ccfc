use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{
    AttendanceLedger, AuditLog, EntityStore, LedgerOutcome, PresenceMark, StoreError, StoreResult,
};
use crate::model::{
    attendance::{DailyAttendanceRecord, LedgerRow},
    attendance_log::{AttendanceLogEntry, NewLogEntry},
    student::{Student, StudentPatch, StudentProfile},
    teacher::{Teacher, TeacherProfile},
};

#[derive(Default)]
struct Tables {
    students: BTreeMap<u64, Student>,
    student_codes: HashMap<String, u64>,
    teachers: BTreeMap<u64, Teacher>,
    teacher_codes: HashMap<String, u64>,
    records: BTreeMap<(u64, NaiveDate), DailyAttendanceRecord>,
    logs: Vec<AttendanceLogEntry>,
    next_student_id: u64,
    next_teacher_id: u64,
    next_record_id: u64,
}

impl Tables {
    fn append_log(&mut self, entry: &NewLogEntry) -> AttendanceLogEntry {
        let row = AttendanceLogEntry {
            id: self.logs.len() as u64 + 1,
            student_id: entry.student_id,
            teacher_id: entry.teacher_id,
            log_date: entry.log_date,
            log_time: entry.log_time,
            method: entry.method,
            raw_payload: entry.raw_payload.clone(),
            success: entry.success,
            message: entry.message.clone(),
        };
        self.logs.push(row.clone());
        row
    }
}

/// Process-local backend. A single lock guards every table, so each trait
/// call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a ledger row as-is, assigning a fresh id.
    #[cfg(test)]
    pub async fn seed_record(&self, mut record: DailyAttendanceRecord) {
        let mut t = self.tables.lock().await;
        t.next_record_id += 1;
        record.id = t.next_record_id;
        t.records
            .insert((record.student_id, record.attendance_date), record);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn upsert_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> StoreResult<(Student, bool)> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();

        if let Some(id) = t.student_codes.get(code).copied() {
            if let Some(student) = t.students.get_mut(&id) {
                student.first_name = profile.first_name.clone();
                student.last_name = profile.last_name.clone();
                student.course = profile.course.clone();
                student.level = profile.level.clone();
                student.is_active = true;
                student.updated_at = now;
                return Ok((student.clone(), false));
            }
        }

        t.next_student_id += 1;
        let student = Student {
            id: t.next_student_id,
            student_code: code.to_string(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            course: profile.course.clone(),
            level: profile.level.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.student_codes.insert(code.to_string(), student.id);
        t.students.insert(student.id, student.clone());
        Ok((student, true))
    }

    async fn upsert_teacher(
        &self,
        code: &str,
        profile: &TeacherProfile,
    ) -> StoreResult<(Teacher, bool)> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();

        if let Some(id) = t.teacher_codes.get(code).copied() {
            if let Some(teacher) = t.teachers.get_mut(&id) {
                teacher.first_name = profile.first_name.clone();
                teacher.last_name = profile.last_name.clone();
                teacher.subject = profile.subject.clone();
                teacher.is_active = true;
                teacher.updated_at = now;
                return Ok((teacher.clone(), false));
            }
        }

        t.next_teacher_id += 1;
        let teacher = Teacher {
            id: t.next_teacher_id,
            teacher_code: code.to_string(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            subject: profile.subject.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.teacher_codes.insert(code.to_string(), teacher.id);
        t.teachers.insert(teacher.id, teacher.clone());
        Ok((teacher, true))
    }

    async fn find_student(&self, code: &str) -> StoreResult<Option<Student>> {
        let t = self.tables.lock().await;
        Ok(t
            .student_codes
            .get(code)
            .and_then(|id| t.students.get(id))
            .cloned())
    }

    async fn find_teacher(&self, code: &str) -> StoreResult<Option<Teacher>> {
        let t = self.tables.lock().await;
        Ok(t
            .teacher_codes
            .get(code)
            .and_then(|id| t.teachers.get(id))
            .cloned())
    }

    async fn list_active_students(&self) -> StoreResult<Vec<Student>> {
        let t = self.tables.lock().await;
        let mut students: Vec<Student> =
            t.students.values().filter(|s| s.is_active).cloned().collect();
        students.sort_by(|a, b| {
            (&a.last_name, &a.first_name, &a.student_code).cmp(&(
                &b.last_name,
                &b.first_name,
                &b.student_code,
            ))
        });
        Ok(students)
    }

    async fn count_active_students(&self) -> StoreResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.students.values().filter(|s| s.is_active).count() as i64)
    }

    async fn update_student(
        &self,
        code: &str,
        patch: &StudentPatch,
    ) -> StoreResult<Option<Student>> {
        let mut t = self.tables.lock().await;
        let Some(id) = t.student_codes.get(code).copied() else {
            return Ok(None);
        };
        Ok(t.students.get_mut(&id).map(|student| {
            patch.apply_to(student);
            student.updated_at = Utc::now();
            student.clone()
        }))
    }

    async fn set_student_active(&self, code: &str, active: bool) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let Some(id) = t.student_codes.get(code).copied() else {
            return Ok(false);
        };
        match t.students.get_mut(&id) {
            Some(student) => {
                if student.is_active != active {
                    student.is_active = active;
                    student.updated_at = Utc::now();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn mark_present(&self, mark: &PresenceMark) -> StoreResult<LedgerOutcome> {
        let mut t = self.tables.lock().await;
        let key = (mark.student_id, mark.date);

        if !t.records.contains_key(&key) {
            t.next_record_id += 1;
            let record = DailyAttendanceRecord {
                id: t.next_record_id,
                student_id: mark.student_id,
                attendance_date: mark.date,
                is_present: false,
                time_marked: None,
                method: mark.method.ledger_method(),
                teacher_id: mark.teacher_id,
            };
            t.records.insert(key, record);
        }

        let Some(record) = t.records.get_mut(&key) else {
            return Err(StoreError::Unavailable("ledger row vanished".into()));
        };
        if record.is_present {
            return Ok(LedgerOutcome::AlreadyPresent(record.clone()));
        }
        record.is_present = true;
        record.time_marked = Some(mark.time);
        record.teacher_id = mark.teacher_id;
        record.method = mark.method.ledger_method();
        let marked = record.clone();

        t.append_log(&mark.success_entry());
        Ok(LedgerOutcome::Marked(marked))
    }

    async fn find_record(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyAttendanceRecord>> {
        let t = self.tables.lock().await;
        Ok(t.records.get(&(student_id, date)).cloned())
    }

    async fn records_for_date(&self, date: NaiveDate) -> StoreResult<Vec<LedgerRow>> {
        let t = self.tables.lock().await;
        let mut rows: Vec<LedgerRow> = t
            .records
            .values()
            .filter(|r| r.attendance_date == date)
            .filter_map(|record| {
                let student = t.students.get(&record.student_id)?;
                let teacher_code = record
                    .teacher_id
                    .and_then(|id| t.teachers.get(&id))
                    .map(|teacher| teacher.teacher_code.clone());
                Some(LedgerRow {
                    record: record.clone(),
                    student_code: student.student_code.clone(),
                    first_name: student.first_name.clone(),
                    last_name: student.last_name.clone(),
                    course: student.course.clone(),
                    level: student.level.clone(),
                    student_active: student.is_active,
                    teacher_code,
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (&a.last_name, &a.first_name, &a.student_code).cmp(&(
                &b.last_name,
                &b.first_name,
                &b.student_code,
            ))
        });
        Ok(rows)
    }

    async fn records_for_student(
        &self,
        student_id: u64,
    ) -> StoreResult<Vec<DailyAttendanceRecord>> {
        let t = self.tables.lock().await;
        Ok(t.records
            .values()
            .rev()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, entry: &NewLogEntry) -> StoreResult<AttendanceLogEntry> {
        let mut t = self.tables.lock().await;
        Ok(t.append_log(entry))
    }

    async fn entries_for_student(&self, student_id: u64) -> StoreResult<Vec<AttendanceLogEntry>> {
        let t = self.tables.lock().await;
        Ok(t.logs
            .iter()
            .rev()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::MarkMethod;
    use chrono::NaiveTime;

    fn profile(first: &str, last: &str) -> StudentProfile {
        StudentProfile {
            first_name: first.into(),
            last_name: last.into(),
            course: "BSIT".into(),
            level: "1".into(),
        }
    }

    fn mark_for(student_id: u64, date: NaiveDate) -> PresenceMark {
        PresenceMark {
            student_id,
            date,
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            teacher_id: None,
            method: MarkMethod::Bulk,
            raw_payload: Some("STUDENT:1".into()),
            message: "Attendance marked".into(),
        }
    }

    #[actix_web::test]
    async fn upsert_refreshes_existing_row_and_reactivates() {
        let store = MemoryStore::new();
        let (first, created) = store.upsert_student("100", &profile("Ana", "Cruz")).await.unwrap();
        assert!(created);
        store.set_student_active("100", false).await.unwrap();

        let (second, created) = store.upsert_student("100", &profile("Anna", "Cruz")).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(second.first_name, "Anna");
        assert!(second.is_active);
        assert_eq!(store.count_active_students().await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn active_students_sorted_by_last_then_first_name() {
        let store = MemoryStore::new();
        store.upsert_student("1", &profile("Zed", "Alpha")).await.unwrap();
        store.upsert_student("2", &profile("Amy", "Beta")).await.unwrap();
        store.upsert_student("3", &profile("Abe", "Alpha")).await.unwrap();
        store.upsert_student("4", &profile("Cal", "Alpha")).await.unwrap();
        store.set_student_active("4", false).await.unwrap();

        let codes: Vec<String> = store
            .list_active_students()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.student_code)
            .collect();
        assert_eq!(codes, vec!["3", "1", "2"]);
    }

    #[actix_web::test]
    async fn bulk_marks_land_in_ledger_as_scans() {
        let store = MemoryStore::new();
        let (student, _) = store.upsert_student("1", &profile("Ana", "Cruz")).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        let outcome = store.mark_present(&mark_for(student.id, date)).await.unwrap();
        let LedgerOutcome::Marked(record) = outcome else {
            panic!("expected a fresh mark");
        };
        assert_eq!(record.method, MarkMethod::Scan);

        let logs = store.entries_for_student(student.id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].method, MarkMethod::Bulk);
    }

    #[actix_web::test]
    async fn second_mark_is_reported_without_writes() {
        let store = MemoryStore::new();
        let (student, _) = store.upsert_student("1", &profile("Ana", "Cruz")).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();

        store.mark_present(&mark_for(student.id, date)).await.unwrap();
        let mut later = mark_for(student.id, date);
        later.time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let outcome = store.mark_present(&later).await.unwrap();

        match outcome {
            LedgerOutcome::AlreadyPresent(record) => {
                assert_eq!(record.time_marked, NaiveTime::from_hms_opt(8, 0, 0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(store.entries_for_student(student.id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn unknown_codes_are_reported_as_missing() {
        let store = MemoryStore::new();
        assert!(store.find_student("nope").await.unwrap().is_none());
        assert!(!store.set_student_active("nope", false).await.unwrap());
        assert!(
            store
                .update_student("nope", &StudentPatch::default())
                .await
                .unwrap()
                .is_none()
        );
    }
}
