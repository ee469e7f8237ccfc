use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Teacher {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "T-100")]
    pub teacher_code: String,

    #[schema(example = "Jose")]
    pub first_name: String,

    #[schema(example = "Rizal")]
    pub last_name: String,

    #[schema(example = "Mathematics")]
    pub subject: String,

    pub is_active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Teacher {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherProfile {
    pub first_name: String,
    pub last_name: String,
    pub subject: String,
}
