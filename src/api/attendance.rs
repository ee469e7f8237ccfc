use super::{MessageResponse, Status, code_from_json, optional_code_from_json};
use crate::{
    error::AppError,
    model::attendance::{LedgerRow, MarkMethod},
    service::{
        marking::{BulkItem, MarkResult, MarkStatus, StudentSummary},
        summary::{AttendanceStatistics, DailySummary},
    },
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    /// Scanned QR payload, `STUDENT:<id>` or anything containing the id digits
    #[schema(example = "STUDENT:2024001")]
    #[serde(alias = "student_id")]
    pub qr_data: String,
    #[schema(example = "T-100", value_type = Option<String>)]
    #[serde(default, deserialize_with = "optional_code_from_json")]
    pub teacher_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ManualMark {
    #[schema(example = "2024001", value_type = String)]
    #[serde(deserialize_with = "code_from_json")]
    pub student_id: String,
    #[schema(example = "T-100", value_type = Option<String>)]
    #[serde(default, deserialize_with = "optional_code_from_json")]
    pub teacher_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkMark {
    #[schema(example = json!(["STUDENT:2024001", "STUDENT:2024002"]))]
    pub qr_data: Vec<String>,
    #[schema(example = "T-100", value_type = Option<String>)]
    #[serde(default, deserialize_with = "optional_code_from_json")]
    pub teacher_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyQuery {
    /// Day to summarise (YYYY-MM-DD), defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "status": "success",
    "message": "Attendance marked successfully",
    "student": {
        "name": "Maria Santos",
        "id": "2024001",
        "course_level": "BSIT - 2",
        "time_marked": "08:01:15"
    }
}))]
pub struct MarkResponse {
    pub status: Status,
    pub message: String,
    pub student: StudentSummary,
}

impl From<MarkResult> for MarkResponse {
    fn from(result: MarkResult) -> Self {
        let status = match result.status {
            MarkStatus::Marked => Status::Success,
            MarkStatus::AlreadyMarked => Status::Warning,
        };
        Self {
            status,
            message: result.message().to_string(),
            student: result.student,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BulkItemResponse {
    #[schema(example = "STUDENT:2024001")]
    pub qr_data: String,
    pub status: Status,
    pub message: String,
    #[schema(nullable = true)]
    pub student: Option<StudentSummary>,
}

impl From<BulkItem> for BulkItemResponse {
    fn from(item: BulkItem) -> Self {
        match item.outcome {
            Ok(result) => {
                let MarkResponse {
                    status,
                    message,
                    student,
                } = result.into();
                Self {
                    qr_data: item.qr_data,
                    status,
                    message,
                    student: Some(student),
                }
            }
            Err(e) => Self {
                qr_data: item.qr_data,
                status: Status::Error,
                message: e.to_string(),
                student: None,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BulkResponse {
    pub status: Status,
    pub results: Vec<BulkItemResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct DailyRecord {
    #[schema(example = "2024001")]
    pub student_id: String,
    #[schema(example = "Maria Santos")]
    pub name: String,
    #[schema(example = "BSIT - 2")]
    pub course_level: String,
    pub is_present: bool,
    #[schema(example = "08:01:15", value_type = Option<String>)]
    pub time_marked: Option<NaiveTime>,
    pub method: MarkMethod,
    #[schema(example = "T-100")]
    pub marked_by: Option<String>,
}

impl From<LedgerRow> for DailyRecord {
    fn from(row: LedgerRow) -> Self {
        Self {
            name: row.student_name(),
            course_level: row.course_level(),
            student_id: row.student_code,
            is_present: row.record.is_present,
            time_marked: row.record.time_marked,
            method: row.record.method,
            marked_by: row.teacher_code,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DailyResponse {
    pub status: Status,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub records: Vec<DailyRecord>,
    pub statistics: AttendanceStatistics,
}

impl From<DailySummary> for DailyResponse {
    fn from(summary: DailySummary) -> Self {
        Self {
            status: Status::Success,
            date: summary.date,
            records: summary.records.into_iter().map(DailyRecord::from).collect(),
            statistics: summary.statistics,
        }
    }
}

/// Mark attendance from a scanned QR payload
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Marked present (success) or already present (warning)", body = MarkResponse),
        (status = 400, description = "Payload carries no student id", body = MessageResponse, example = json!({
            "status": "error",
            "message": "Invalid QR code: no student ID found"
        })),
        (status = 404, description = "No active student with this id", body = MessageResponse, example = json!({
            "status": "error",
            "message": "Student ID not found in database."
        })),
        (status = 500, description = "Marking failed", body = MessageResponse)
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    state: web::Data<AppState>,
    payload: web::Json<MarkAttendance>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .marking
        .mark_attendance(&payload.qr_data, payload.teacher_id.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(MarkResponse::from(result)))
}

/// Mark a student present by hand
#[utoipa::path(
    post,
    path = "/api/attendance/manual",
    request_body = ManualMark,
    responses(
        (status = 200, description = "Marked present (success) or already present (warning)", body = MarkResponse),
        (status = 404, description = "No active student with this id", body = MessageResponse),
        (status = 500, description = "Marking failed", body = MessageResponse)
    ),
    tag = "Attendance"
)]
pub async fn mark_manual(
    state: web::Data<AppState>,
    payload: web::Json<ManualMark>,
) -> Result<HttpResponse, AppError> {
    let result = state
        .marking
        .mark_manual(&payload.student_id, payload.teacher_id.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(MarkResponse::from(result)))
}

/// Mark a batch of scanned payloads
#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkMark,
    responses(
        (status = 200, description = "Per-item outcomes", body = BulkResponse),
        (status = 400, description = "Empty or oversized batch", body = MessageResponse)
    ),
    tag = "Attendance"
)]
pub async fn mark_bulk(
    state: web::Data<AppState>,
    payload: web::Json<BulkMark>,
) -> Result<HttpResponse, AppError> {
    let items = state
        .marking
        .mark_bulk(
            &payload.qr_data,
            payload.teacher_id.as_deref(),
            state.bulk_max_items,
        )
        .await?;

    Ok(HttpResponse::Ok().json(BulkResponse {
        status: Status::Success,
        results: items.into_iter().map(BulkItemResponse::from).collect(),
    }))
}

/// Daily attendance records and statistics
#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Visited records and day statistics", body = DailyResponse),
        (status = 400, description = "Malformed date", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Attendance"
)]
pub async fn daily_attendance(
    state: web::Data<AppState>,
    query: web::Query<DailyQuery>,
) -> Result<HttpResponse, AppError> {
    let date = query.date.unwrap_or_else(|| state.today());
    let summary = state.summary.get_daily_summary(date).await?;

    Ok(HttpResponse::Ok().json(DailyResponse::from(summary)))
}
