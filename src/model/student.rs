use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tag prefixed to a student's code in the QR payload handed out at registration.
pub const STUDENT_QR_TAG: &str = "STUDENT";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "student_code": "2024001",
        "first_name": "Maria",
        "last_name": "Santos",
        "course": "BSIT",
        "level": "2",
        "is_active": true,
        "created_at": "2026-01-01T08:00:00Z",
        "updated_at": "2026-01-01T08:00:00Z"
    })
)]
pub struct Student {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "2024001")]
    pub student_code: String,

    #[schema(example = "Maria")]
    pub first_name: String,

    #[schema(example = "Santos")]
    pub last_name: String,

    #[schema(example = "BSIT")]
    pub course: String,

    #[schema(example = "2")]
    pub level: String,

    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn course_level(&self) -> String {
        format!("{} - {}", self.course, self.level)
    }

    /// Payload encoded into the student's own QR code.
    pub fn qr_data(&self) -> String {
        format!("{}:{}", STUDENT_QR_TAG, self.student_code)
    }
}

/// Profile fields overwritten on every registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub first_name: String,
    pub last_name: String,
    pub course: String,
    pub level: String,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub course: Option<String>,
    pub level: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.course.is_none()
            && self.level.is_none()
    }

    pub fn apply_to(&self, student: &mut Student) {
        if let Some(v) = &self.first_name {
            student.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            student.last_name = v.clone();
        }
        if let Some(v) = &self.course {
            student.course = v.clone();
        }
        if let Some(v) = &self.level {
            student.level = v.clone();
        }
    }
}
