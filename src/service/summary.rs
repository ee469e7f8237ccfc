use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::{
    attendance::{DailyAttendanceRecord, LedgerRow},
    attendance_log::AttendanceLogEntry,
    student::Student,
};
use crate::store::AttendanceStore;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct AttendanceStatistics {
    #[schema(example = 10)]
    pub total: i64,
    #[schema(example = 2)]
    pub present: i64,
    #[schema(example = 8)]
    pub absent: i64,
    #[schema(example = 20.0)]
    pub attendance_rate: f64,
}

impl AttendanceStatistics {
    /// `absent` is everything active that is not present, visited or not.
    pub fn compute(total_active: i64, present: i64) -> Self {
        let attendance_rate = if total_active > 0 {
            let pct = present as f64 / total_active as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total: total_active,
            present,
            absent: (total_active - present).max(0),
            attendance_rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Only students that were touched on `date`.
    pub records: Vec<LedgerRow>,
    pub statistics: AttendanceStatistics,
}

#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub student: Student,
    pub present: bool,
    pub time_marked: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct StudentHistory {
    pub student: Student,
    pub records: Vec<DailyAttendanceRecord>,
    pub logs: Vec<AttendanceLogEntry>,
}

/// Read-only projections over the ledger.
#[derive(Clone)]
pub struct SummaryService {
    store: Arc<dyn AttendanceStore>,
}

impl SummaryService {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    pub async fn get_daily_summary(&self, date: NaiveDate) -> Result<DailySummary, AppError> {
        let records = self.store.records_for_date(date).await?;
        let total = self.store.count_active_students().await?;
        let present = records
            .iter()
            .filter(|r| r.record.is_present && r.student_active)
            .count() as i64;

        Ok(DailySummary {
            date,
            records,
            statistics: AttendanceStatistics::compute(total, present),
        })
    }

    /// Every active student with their presence on `date`.
    pub async fn list_roster(&self, date: NaiveDate) -> Result<Vec<RosterEntry>, AppError> {
        let students = self.store.list_active_students().await?;
        let by_student: HashMap<u64, DailyAttendanceRecord> = self
            .store
            .records_for_date(date)
            .await?
            .into_iter()
            .map(|row| (row.record.student_id, row.record))
            .collect();

        Ok(students
            .into_iter()
            .map(|student| {
                let record = by_student.get(&student.id);
                RosterEntry {
                    present: record.is_some_and(|r| r.is_present),
                    time_marked: record.and_then(|r| r.time_marked),
                    student,
                }
            })
            .collect())
    }

    /// Ledger and audit history, also for deactivated students.
    pub async fn student_history(&self, code: &str) -> Result<StudentHistory, AppError> {
        let student = self
            .store
            .find_student(code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {} not found", code.trim())))?;
        let records = self.store.records_for_student(student.id).await?;
        let logs = self.store.entries_for_student(student.id).await?;

        Ok(StudentHistory {
            student,
            records,
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::MarkMethod;
    use crate::service::marking::MarkingService;
    use crate::service::test_support::{at, fixed_clock, memory_store, school_day, student_profile};
    use crate::store::{EntityStore, memory::MemoryStore};

    #[test]
    fn statistics_round_to_two_decimals() {
        let stats = AttendanceStatistics::compute(3, 1);
        assert_eq!(stats.attendance_rate, 33.33);
        assert_eq!(stats.absent, 2);

        let stats = AttendanceStatistics::compute(0, 0);
        assert_eq!(stats.attendance_rate, 0.0);
        assert_eq!(stats.absent, 0);
    }

    #[actix_web::test]
    async fn ten_students_two_present_one_visited_absent() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn AttendanceStore> = memory.clone();
        let mut ids = Vec::new();
        for i in 0..10 {
            let (s, _) = store
                .upsert_student(&format!("S{i:02}"), &student_profile("Kid", &format!("N{i:02}")))
                .await
                .unwrap();
            ids.push(s.id);
        }

        let marking = MarkingService::new(store.clone(), fixed_clock(at(school_day(), 8, 0, 0)));
        marking.mark_attendance("STUDENT:S00", None).await.unwrap();
        marking.mark_attendance("STUDENT:S01", None).await.unwrap();
        memory
            .seed_record(DailyAttendanceRecord {
                id: 0,
                student_id: ids[2],
                attendance_date: school_day(),
                is_present: false,
                time_marked: None,
                method: MarkMethod::Scan,
                teacher_id: None,
            })
            .await;

        let summary = SummaryService::new(store.clone())
            .get_daily_summary(school_day())
            .await
            .unwrap();

        assert_eq!(summary.records.len(), 3);
        assert_eq!(summary.statistics.total, 10);
        assert_eq!(summary.statistics.present, 2);
        assert_eq!(summary.statistics.absent, 8);
        assert_eq!(summary.statistics.attendance_rate, 20.0);
    }

    #[actix_web::test]
    async fn untouched_students_are_omitted_from_records() {
        let store = memory_store();
        store.upsert_student("1", &student_profile("Ana", "Cruz")).await.unwrap();
        store.upsert_student("2", &student_profile("Ben", "Abad")).await.unwrap();

        let marking = MarkingService::new(store.clone(), fixed_clock(at(school_day(), 8, 0, 0)));
        marking.mark_attendance("STUDENT:1", None).await.unwrap();

        let service = SummaryService::new(store.clone());
        let summary = service.get_daily_summary(school_day()).await.unwrap();
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].student_code, "1");

        let roster = service.list_roster(school_day()).await.unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].student.student_code, "2");
        assert!(!roster[0].present);
        assert!(roster[1].present);
        assert_eq!(roster[1].time_marked, NaiveTime::from_hms_opt(8, 0, 0));
    }

    #[actix_web::test]
    async fn deactivated_student_history_stays_queryable() {
        let store = memory_store();
        store.upsert_student("1", &student_profile("Ana", "Cruz")).await.unwrap();
        let marking = MarkingService::new(store.clone(), fixed_clock(at(school_day(), 8, 0, 0)));
        marking.mark_attendance("STUDENT:1", None).await.unwrap();
        store.set_student_active("1", false).await.unwrap();

        let service = SummaryService::new(store.clone());
        let history = service.student_history("1").await.unwrap();
        assert!(!history.student.is_active);
        assert_eq!(history.records.len(), 1);
        assert_eq!(history.logs.len(), 1);

        // Inactive students no longer count towards the day's statistics.
        let summary = service.get_daily_summary(school_day()).await.unwrap();
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.statistics.total, 0);
        assert_eq!(summary.statistics.present, 0);

        assert!(matches!(
            service.student_history("nobody").await,
            Err(AppError::NotFound(_))
        ));
    }
}
