use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::model::{
    student::{Student, StudentPatch, StudentProfile},
    teacher::{Teacher, TeacherProfile},
};
use crate::store::AttendanceStore;

// Column widths of the students/teachers tables.
const CODE_MAX: usize = 20;
const NAME_MAX: usize = 50;
const COURSE_MAX: usize = 50;
const LEVEL_MAX: usize = 10;
const SUBJECT_MAX: usize = 100;

fn required(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

fn optional(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, AppError> {
    value.map(|v| required(field, v, max)).transpose()
}

/// Student and teacher registration plus roster maintenance.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn AttendanceStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Self {
        Self { store }
    }

    pub async fn upsert_student(
        &self,
        code: &str,
        profile: StudentProfile,
    ) -> Result<(Student, bool), AppError> {
        let code = required("id", code, CODE_MAX)?;
        let profile = StudentProfile {
            first_name: required("firstname", &profile.first_name, NAME_MAX)?,
            last_name: required("lastname", &profile.last_name, NAME_MAX)?,
            course: required("course", &profile.course, COURSE_MAX)?,
            level: required("level", &profile.level, LEVEL_MAX)?,
        };

        let (student, created) = self.store.upsert_student(&code, &profile).await?;
        info!(student_code = %student.student_code, created, "Student registered");
        Ok((student, created))
    }

    pub async fn upsert_teacher(
        &self,
        code: &str,
        profile: TeacherProfile,
    ) -> Result<(Teacher, bool), AppError> {
        let code = required("id", code, CODE_MAX)?;
        let profile = TeacherProfile {
            first_name: required("firstname", &profile.first_name, NAME_MAX)?,
            last_name: required("lastname", &profile.last_name, NAME_MAX)?,
            subject: required("subject", &profile.subject, SUBJECT_MAX)?,
        };

        let (teacher, created) = self.store.upsert_teacher(&code, &profile).await?;
        info!(teacher_code = %teacher.teacher_code, created, "Teacher registered");
        Ok((teacher, created))
    }

    /// Any student with this code, active or not.
    pub async fn get_student(&self, code: &str) -> Result<Student, AppError> {
        self.store
            .find_student(code.trim())
            .await?
            .ok_or_else(|| student_not_found(code))
    }

    pub async fn update_student(
        &self,
        code: &str,
        patch: StudentPatch,
    ) -> Result<Student, AppError> {
        let code = required("student_id", code, CODE_MAX)?;
        let patch = StudentPatch {
            first_name: optional("firstname", patch.first_name.as_deref(), NAME_MAX)?,
            last_name: optional("lastname", patch.last_name.as_deref(), NAME_MAX)?,
            course: optional("course", patch.course.as_deref(), COURSE_MAX)?,
            level: optional("level", patch.level.as_deref(), LEVEL_MAX)?,
        };
        if patch.is_empty() {
            return Err(AppError::Validation("No fields provided for update".into()));
        }

        let student = self
            .store
            .update_student(&code, &patch)
            .await?
            .ok_or_else(|| student_not_found(&code))?;
        info!(student_code = %code, "Student updated");
        Ok(student)
    }

    /// Soft delete; ledger and audit history stay in place.
    pub async fn deactivate_student(&self, code: &str) -> Result<(), AppError> {
        let code = required("student_id", code, CODE_MAX)?;
        if !self.store.set_student_active(&code, false).await? {
            return Err(student_not_found(&code));
        }
        info!(student_code = %code, "Student deactivated");
        Ok(())
    }
}

fn student_not_found(code: &str) -> AppError {
    AppError::NotFound(format!("Student {} not found", code.trim()))
}
