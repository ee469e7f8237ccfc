use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tracing::{debug, warn};

use super::{
    AttendanceLedger, AuditLog, EntityStore, LedgerOutcome, PresenceMark, StoreError, StoreResult,
};
use crate::model::{
    attendance::{DailyAttendanceRecord, LedgerRow, MarkMethod},
    attendance_log::{AttendanceLogEntry, NewLogEntry},
    student::{Student, StudentPatch, StudentProfile},
    teacher::{Teacher, TeacherProfile},
};
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update};

const STUDENT_COLUMNS: &str =
    "id, student_code, first_name, last_name, course, level, is_active, created_at, updated_at";

const TEACHER_COLUMNS: &str =
    "id, teacher_code, first_name, last_name, subject, is_active, created_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, student_id, attendance_date, is_present, time_marked, method, teacher_id";

const LOG_COLUMNS: &str =
    "id, student_id, teacher_id, log_date, log_time, method, raw_payload, success, message";

/// SQLSTATE InnoDB reports when it aborts a transaction to break a deadlock.
const DEADLOCK: &str = "40001";

/// Attempts at the ledger transaction before a deadlock is surfaced.
const MARK_ATTEMPTS: u32 = 3;

// ---------- row mapping ----------

#[derive(FromRow)]
struct RecordSql {
    id: u64,
    student_id: u64,
    attendance_date: NaiveDate,
    is_present: bool,
    time_marked: Option<NaiveTime>,
    method: String,
    teacher_id: Option<u64>,
}

#[derive(FromRow)]
struct LedgerRowSql {
    #[sqlx(flatten)]
    record: RecordSql,
    student_code: String,
    first_name: String,
    last_name: String,
    course: String,
    level: String,
    student_active: bool,
    teacher_code: Option<String>,
}

#[derive(FromRow)]
struct LogSql {
    id: u64,
    student_id: u64,
    teacher_id: Option<u64>,
    log_date: NaiveDate,
    log_time: NaiveTime,
    method: String,
    raw_payload: Option<String>,
    success: bool,
    message: String,
}

fn parse_method(raw: &str) -> StoreResult<MarkMethod> {
    raw.parse()
        .map_err(|_| StoreError::CorruptRow(format!("unknown marking method '{}'", raw)))
}

impl TryFrom<RecordSql> for DailyAttendanceRecord {
    type Error = StoreError;

    fn try_from(row: RecordSql) -> StoreResult<Self> {
        Ok(DailyAttendanceRecord {
            id: row.id,
            student_id: row.student_id,
            attendance_date: row.attendance_date,
            is_present: row.is_present,
            time_marked: row.time_marked,
            method: parse_method(&row.method)?,
            teacher_id: row.teacher_id,
        })
    }
}

impl TryFrom<LedgerRowSql> for LedgerRow {
    type Error = StoreError;

    fn try_from(row: LedgerRowSql) -> StoreResult<Self> {
        Ok(LedgerRow {
            record: row.record.try_into()?,
            student_code: row.student_code,
            first_name: row.first_name,
            last_name: row.last_name,
            course: row.course,
            level: row.level,
            student_active: row.student_active,
            teacher_code: row.teacher_code,
        })
    }
}

impl TryFrom<LogSql> for AttendanceLogEntry {
    type Error = StoreError;

    fn try_from(row: LogSql) -> StoreResult<Self> {
        Ok(AttendanceLogEntry {
            id: row.id,
            student_id: row.student_id,
            teacher_id: row.teacher_id,
            log_date: row.log_date,
            log_time: row.log_time,
            method: parse_method(&row.method)?,
            raw_payload: row.raw_payload,
            success: row.success,
            message: row.message,
        })
    }
}

fn is_retryable(sqlstate: Option<&str>) -> bool {
    sqlstate == Some(DEADLOCK)
}

fn is_deadlock(e: &StoreError) -> bool {
    match e {
        StoreError::Database(sqlx::Error::Database(db_err)) => is_retryable(db_err.code().as_deref()),
        _ => false,
    }
}

/// `ON DUPLICATE KEY UPDATE` reports 1 for a fresh insert and 2 for a refreshed row.
fn was_inserted(rows_affected: u64) -> bool {
    rows_affected == 1
}

/// Cuts a value down to a VARCHAR column width on a char boundary.
fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

// ---------- store ----------

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn student_by_code_tx(
        tx: &mut Transaction<'_, MySql>,
        code: &str,
    ) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE student_code = ?", STUDENT_COLUMNS);
        Ok(sqlx::query_as::<_, Student>(&sql)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?)
    }

    async fn teacher_by_code_tx(
        tx: &mut Transaction<'_, MySql>,
        code: &str,
    ) -> StoreResult<Option<Teacher>> {
        let sql = format!("SELECT {} FROM teachers WHERE teacher_code = ?", TEACHER_COLUMNS);
        Ok(sqlx::query_as::<_, Teacher>(&sql)
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?)
    }

    async fn insert_log_tx(
        tx: &mut Transaction<'_, MySql>,
        entry: &NewLogEntry,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_logs
                (student_id, teacher_id, log_date, log_time, method, raw_payload, success, message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.student_id)
        .bind(entry.teacher_id)
        .bind(entry.log_date)
        .bind(entry.log_time)
        .bind(entry.method.as_ref())
        .bind(entry.raw_payload.as_deref().map(|p| clip(p, 255)))
        .bind(entry.success)
        .bind(clip(&entry.message, 255))
        .execute(&mut **tx)
        .await?;

        Ok(result.last_insert_id())
    }

    /// One attempt at the fetch-or-create plus absent -> present flip.
    async fn mark_present_once(&self, mark: &PresenceMark) -> StoreResult<LedgerOutcome> {
        let ledger_method = mark.method.ledger_method();
        let mut tx = self.pool.begin().await?;

        // Lazily create today's row. On the (student_id, attendance_date) duplicate
        // the no-op update takes an exclusive row lock, so racing marks queue here
        // instead of each holding a shared lock into the FOR UPDATE below.
        sqlx::query(
            r#"
            INSERT INTO daily_attendance (student_id, attendance_date, is_present, method, teacher_id)
            VALUES (?, ?, FALSE, ?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(mark.student_id)
        .bind(mark.date)
        .bind(ledger_method.as_ref())
        .bind(mark.teacher_id)
        .execute(&mut *tx)
        .await?;

        let select = format!(
            "SELECT {} FROM daily_attendance WHERE student_id = ? AND attendance_date = ? FOR UPDATE",
            RECORD_COLUMNS
        );
        let current: DailyAttendanceRecord = sqlx::query_as::<_, RecordSql>(&select)
            .bind(mark.student_id)
            .bind(mark.date)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        if current.is_present {
            tx.rollback().await?;
            return Ok(LedgerOutcome::AlreadyPresent(current));
        }

        sqlx::query(
            r#"
            UPDATE daily_attendance
            SET is_present = TRUE, time_marked = ?, method = ?, teacher_id = ?
            WHERE id = ?
            "#,
        )
        .bind(mark.time)
        .bind(ledger_method.as_ref())
        .bind(mark.teacher_id)
        .bind(current.id)
        .execute(&mut *tx)
        .await?;

        let log_id = Self::insert_log_tx(&mut tx, &mark.success_entry()).await?;
        tx.commit().await?;

        debug!(
            student_id = mark.student_id,
            date = %mark.date,
            log_id,
            "Ledger row marked present"
        );

        Ok(LedgerOutcome::Marked(DailyAttendanceRecord {
            is_present: true,
            time_marked: Some(mark.time),
            method: ledger_method,
            teacher_id: mark.teacher_id,
            ..current
        }))
    }
}

#[async_trait]
impl EntityStore for MySqlStore {
    async fn upsert_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> StoreResult<(Student, bool)> {
        let mut tx = self.pool.begin().await?;

        // updated_at always moves, so an identical re-registration still counts as an update.
        let result = sqlx::query(
            r#"
            INSERT INTO students (student_code, first_name, last_name, course, level)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                first_name = VALUES(first_name),
                last_name = VALUES(last_name),
                course = VALUES(course),
                level = VALUES(level),
                is_active = TRUE,
                updated_at = CURRENT_TIMESTAMP(6)
            "#,
        )
        .bind(code)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.course)
        .bind(&profile.level)
        .execute(&mut *tx)
        .await?;
        let created = was_inserted(result.rows_affected());

        let student = Self::student_by_code_tx(&mut tx, code)
            .await?
            .ok_or_else(|| StoreError::CorruptRow(format!("student {} missing after upsert", code)))?;
        tx.commit().await?;

        debug!(student_code = code, created, "Student upserted");
        Ok((student, created))
    }

    async fn upsert_teacher(
        &self,
        code: &str,
        profile: &TeacherProfile,
    ) -> StoreResult<(Teacher, bool)> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO teachers (teacher_code, first_name, last_name, subject)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                first_name = VALUES(first_name),
                last_name = VALUES(last_name),
                subject = VALUES(subject),
                is_active = TRUE,
                updated_at = CURRENT_TIMESTAMP(6)
            "#,
        )
        .bind(code)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.subject)
        .execute(&mut *tx)
        .await?;
        let created = was_inserted(result.rows_affected());

        let teacher = Self::teacher_by_code_tx(&mut tx, code)
            .await?
            .ok_or_else(|| StoreError::CorruptRow(format!("teacher {} missing after upsert", code)))?;
        tx.commit().await?;

        debug!(teacher_code = code, created, "Teacher upserted");
        Ok((teacher, created))
    }

    async fn find_student(&self, code: &str) -> StoreResult<Option<Student>> {
        let sql = format!("SELECT {} FROM students WHERE student_code = ?", STUDENT_COLUMNS);
        Ok(sqlx::query_as::<_, Student>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_teacher(&self, code: &str) -> StoreResult<Option<Teacher>> {
        let sql = format!("SELECT {} FROM teachers WHERE teacher_code = ?", TEACHER_COLUMNS);
        Ok(sqlx::query_as::<_, Teacher>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_active_students(&self) -> StoreResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students WHERE is_active = TRUE ORDER BY last_name, first_name, student_code",
            STUDENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Student>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_active_students(&self) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn update_student(
        &self,
        code: &str,
        patch: &StudentPatch,
    ) -> StoreResult<Option<Student>> {
        let fields: Vec<(&'static str, SqlValue)> = [
            ("first_name", &patch.first_name),
            ("last_name", &patch.last_name),
            ("course", &patch.course),
            ("level", &patch.level),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.clone().map(|v| (column, SqlValue::String(v))))
        .collect();

        let mut tx = self.pool.begin().await?;
        if let Some(update) = build_update_sql("students", fields, "student_code", code) {
            let affected = execute_update(&mut tx, update).await?;
            debug!(student_code = code, affected, "Student patched");
        }
        let student = Self::student_by_code_tx(&mut tx, code).await?;
        tx.commit().await?;
        Ok(student)
    }

    async fn set_student_active(&self, code: &str, active: bool) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let exists = Self::student_by_code_tx(&mut tx, code).await?.is_some();
        if exists {
            if let Some(update) = build_update_sql(
                "students",
                vec![("is_active", SqlValue::Bool(active))],
                "student_code",
                code,
            ) {
                execute_update(&mut tx, update).await?;
            }
        }
        tx.commit().await?;
        Ok(exists)
    }
}

#[async_trait]
impl AttendanceLedger for MySqlStore {
    async fn mark_present(&self, mark: &PresenceMark) -> StoreResult<LedgerOutcome> {
        let mut attempt = 1;
        loop {
            match self.mark_present_once(mark).await {
                Err(e) if is_deadlock(&e) && attempt < MARK_ATTEMPTS => {
                    warn!(
                        student_id = mark.student_id,
                        date = %mark.date,
                        attempt,
                        "Ledger transaction deadlocked, retrying"
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn find_record(
        &self,
        student_id: u64,
        date: NaiveDate,
    ) -> StoreResult<Option<DailyAttendanceRecord>> {
        let sql = format!(
            "SELECT {} FROM daily_attendance WHERE student_id = ? AND attendance_date = ?",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, RecordSql>(&sql)
            .bind(student_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(DailyAttendanceRecord::try_from)
            .transpose()
    }

    async fn records_for_date(&self, date: NaiveDate) -> StoreResult<Vec<LedgerRow>> {
        let rows = sqlx::query_as::<_, LedgerRowSql>(
            r#"
            SELECT
                d.id, d.student_id, d.attendance_date, d.is_present, d.time_marked, d.method, d.teacher_id,
                s.student_code, s.first_name, s.last_name, s.course, s.level,
                s.is_active AS student_active,
                t.teacher_code
            FROM daily_attendance d
            JOIN students s ON s.id = d.student_id
            LEFT JOIN teachers t ON t.id = d.teacher_id
            WHERE d.attendance_date = ?
            ORDER BY s.last_name, s.first_name, s.student_code
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerRow::try_from).collect()
    }

    async fn records_for_student(
        &self,
        student_id: u64,
    ) -> StoreResult<Vec<DailyAttendanceRecord>> {
        let sql = format!(
            "SELECT {} FROM daily_attendance WHERE student_id = ? ORDER BY attendance_date DESC",
            RECORD_COLUMNS
        );
        sqlx::query_as::<_, RecordSql>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(DailyAttendanceRecord::try_from)
            .collect()
    }
}

#[async_trait]
impl AuditLog for MySqlStore {
    async fn append(&self, entry: &NewLogEntry) -> StoreResult<AttendanceLogEntry> {
        let mut tx = self.pool.begin().await?;
        let id = Self::insert_log_tx(&mut tx, entry).await?;
        tx.commit().await?;

        Ok(AttendanceLogEntry {
            id,
            student_id: entry.student_id,
            teacher_id: entry.teacher_id,
            log_date: entry.log_date,
            log_time: entry.log_time,
            method: entry.method,
            raw_payload: entry.raw_payload.clone(),
            success: entry.success,
            message: entry.message.clone(),
        })
    }

    async fn entries_for_student(&self, student_id: u64) -> StoreResult<Vec<AttendanceLogEntry>> {
        let sql = format!(
            "SELECT {} FROM attendance_logs WHERE student_id = ? ORDER BY id DESC",
            LOG_COLUMNS
        );
        sqlx::query_as::<_, LogSql>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceLogEntry::try_from)
            .collect()
    }
}
