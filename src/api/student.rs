use super::{MessageResponse, Status, code_from_json};
use crate::{
    error::AppError,
    model::student::{Student, StudentPatch, StudentProfile},
    service::summary::RosterEntry,
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterStudent {
    #[schema(example = "2024001", value_type = String)]
    #[serde(deserialize_with = "code_from_json")]
    pub id: String,
    #[schema(example = "Maria")]
    pub firstname: String,
    #[schema(example = "Santos")]
    pub lastname: String,
    #[schema(example = "BSIT")]
    pub course: String,
    #[schema(example = "2")]
    pub level: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStudent {
    #[schema(example = "2024001", value_type = String)]
    #[serde(deserialize_with = "code_from_json")]
    pub student_id: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub course: Option<String>,
    pub level: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeactivateStudent {
    #[schema(example = "2024001", value_type = String)]
    #[serde(deserialize_with = "code_from_json")]
    pub student_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct StudentView {
    #[schema(example = "2024001")]
    pub id: String,
    #[schema(example = "Maria Santos")]
    pub name: String,
    #[schema(example = "BSIT")]
    pub course: String,
    #[schema(example = "2")]
    pub level: String,
    #[schema(example = "STUDENT:2024001")]
    pub qr_data: String,
    pub active: bool,
    /// true when this request created the record
    pub created: bool,
    #[schema(example = "2026-01-01T08:00:00Z", format = "date-time", value_type = String)]
    pub registered_at: DateTime<Utc>,
}

impl StudentView {
    fn new(student: &Student, created: bool) -> Self {
        Self {
            id: student.student_code.clone(),
            name: student.full_name(),
            course: student.course.clone(),
            level: student.level.clone(),
            qr_data: student.qr_data(),
            active: student.is_active,
            created,
            registered_at: student.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentResponse {
    pub status: Status,
    #[schema(example = "Student Profile Loaded")]
    pub message: String,
    pub student: StudentView,
}

#[derive(Serialize, ToSchema)]
pub struct RosterItem {
    #[schema(example = "2024001")]
    pub id: String,
    #[schema(example = "Maria Santos")]
    pub name: String,
    #[schema(example = "BSIT - 2")]
    pub course_level: String,
    #[schema(example = "STUDENT:2024001")]
    pub qr_data: String,
    pub present_today: bool,
    #[schema(example = "08:01:15", value_type = Option<String>)]
    pub time_marked: Option<NaiveTime>,
}

impl From<RosterEntry> for RosterItem {
    fn from(entry: RosterEntry) -> Self {
        Self {
            id: entry.student.student_code.clone(),
            name: entry.student.full_name(),
            course_level: entry.student.course_level(),
            qr_data: entry.student.qr_data(),
            present_today: entry.present,
            time_marked: entry.time_marked,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub status: Status,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub students: Vec<RosterItem>,
    #[schema(example = 1)]
    pub total: usize,
}

/// Register (or refresh) a student
#[utoipa::path(
    post,
    path = "/api/login/student",
    request_body = RegisterStudent,
    responses(
        (status = 200, description = "Student created or refreshed", body = StudentResponse),
        (status = 400, description = "Missing or empty field", body = MessageResponse, example = json!({
            "status": "error",
            "message": "course is required"
        })),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Student"
)]
pub async fn register_student(
    state: web::Data<AppState>,
    payload: web::Json<RegisterStudent>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let profile = StudentProfile {
        first_name: payload.firstname,
        last_name: payload.lastname,
        course: payload.course,
        level: payload.level,
    };

    let (student, created) = state.registry.upsert_student(&payload.id, profile).await?;

    Ok(HttpResponse::Ok().json(StudentResponse {
        status: Status::Success,
        message: "Student Profile Loaded".to_string(),
        student: StudentView::new(&student, created),
    }))
}

/// Active roster with today's presence
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "Active students ordered by last name", body = StudentListResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Student"
)]
pub async fn list_students(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let date = state.today();
    let students: Vec<RosterItem> = state
        .summary
        .list_roster(date)
        .await?
        .into_iter()
        .map(RosterItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(StudentListResponse {
        status: Status::Success,
        date,
        total: students.len(),
        students,
    }))
}

/// Update supplied student fields
#[utoipa::path(
    post,
    path = "/api/students/update",
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "No fields or empty field", body = MessageResponse),
        (status = 404, description = "Student not found", body = MessageResponse, example = json!({
            "status": "error",
            "message": "Student 2024001 not found"
        }))
    ),
    tag = "Student"
)]
pub async fn update_student(
    state: web::Data<AppState>,
    payload: web::Json<UpdateStudent>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let patch = StudentPatch {
        first_name: payload.firstname,
        last_name: payload.lastname,
        course: payload.course,
        level: payload.level,
    };

    let student = state
        .registry
        .update_student(&payload.student_id, patch)
        .await?;

    Ok(HttpResponse::Ok().json(StudentResponse {
        status: Status::Success,
        message: "Student updated successfully".to_string(),
        student: StudentView::new(&student, false),
    }))
}

/// Soft-delete a student
#[utoipa::path(
    post,
    path = "/api/students/deactivate",
    request_body = DeactivateStudent,
    responses(
        (status = 200, description = "Student deactivated", body = MessageResponse, example = json!({
            "status": "success",
            "message": "Student 2024001 deactivated"
        })),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student"
)]
pub async fn deactivate_student(
    state: web::Data<AppState>,
    payload: web::Json<DeactivateStudent>,
) -> Result<HttpResponse, AppError> {
    state
        .registry
        .deactivate_student(&payload.student_id)
        .await?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        status: Status::Success,
        message: format!("Student {} deactivated", payload.student_id.trim()),
    }))
}

/// One student profile, active or not
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    params(
        ("student_id", Path, description = "Student identity code")
    ),
    responses(
        (status = 200, description = "Student profile", body = StudentResponse),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student"
)]
pub async fn get_student(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let student = state.registry.get_student(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(StudentResponse {
        status: Status::Success,
        message: "Student Profile Loaded".to_string(),
        student: StudentView::new(&student, false),
    }))
}

/// Ledger and audit history of one student
#[utoipa::path(
    get,
    path = "/api/students/{student_id}/history",
    params(
        ("student_id", Path, description = "Student identity code")
    ),
    responses(
        (status = 200, description = "History, newest first", body = Object),
        (status = 404, description = "Student not found", body = MessageResponse)
    ),
    tag = "Student"
)]
pub async fn student_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let history = state.summary.student_history(&code).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "student": StudentView::new(&history.student, false),
        "records": history.records,
        "logs": history.logs,
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::test_app::{get, init_app, post};
    use crate::service::test_support::memory_store;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    fn maria() -> Value {
        json!({
            "id": "2024001",
            "firstname": "Maria",
            "lastname": "Santos",
            "course": "BSIT",
            "level": "2"
        })
    }

    #[actix_web::test]
    async fn register_then_refresh_reports_created_once() {
        let app = init_app!(memory_store());

        let resp = test::call_service(&app, post("/api/login/student", maria()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["student"]["qr_data"], "STUDENT:2024001");
        assert_eq!(body["student"]["name"], "Maria Santos");
        assert_eq!(body["student"]["created"], true);

        let mut refreshed = maria();
        refreshed["level"] = json!("3");
        let resp = test::call_service(&app, post("/api/login/student/", refreshed).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["student"]["created"], false);
        assert_eq!(body["student"]["level"], "3");
    }

    #[actix_web::test]
    async fn missing_or_blank_fields_are_bad_requests() {
        let app = init_app!(memory_store());

        let resp = test::call_service(
            &app,
            post("/api/login/student", json!({"id": "1", "firstname": "A"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "error");

        let mut blank = maria();
        blank["course"] = json!("  ");
        let resp = test::call_service(&app, post("/api/login/student", blank).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn wrong_method_is_an_invalid_method_error() {
        let app = init_app!(memory_store());
        let resp = test::call_service(&app, get("/api/login/student").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid request method");
    }

    #[actix_web::test]
    async fn update_deactivate_and_list() {
        let app = init_app!(memory_store());
        test::call_service(&app, post("/api/login/student", maria()).to_request()).await;
        let mut other = maria();
        other["id"] = json!(2024002);
        other["lastname"] = json!("Abad");
        test::call_service(&app, post("/api/login/student", other).to_request()).await;

        let resp = test::call_service(
            &app,
            post(
                "/api/students/update",
                json!({"student_id": "2024001", "course": "BSCS"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["student"]["course"], "BSCS");
        assert_eq!(body["student"]["name"], "Maria Santos");

        let resp = test::call_service(&app, get("/api/students").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["students"][0]["id"], "2024002");
        assert_eq!(body["students"][0]["present_today"], false);

        let resp = test::call_service(
            &app,
            post("/api/students/deactivate", json!({"student_id": "2024002"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, get("/api/students").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["total"], 1);

        let resp = test::call_service(&app, get("/api/students/2024002").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["student"]["name"], "Maria Abad");
        assert_eq!(body["student"]["active"], false);

        let resp = test::call_service(&app, get("/api/students/2024002/history").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["student"]["active"], false);
    }

    #[actix_web::test]
    async fn unknown_student_update_is_not_found() {
        let app = init_app!(memory_store());
        let resp = test::call_service(
            &app,
            post("/api/students/update", json!({"student_id": "9", "level": "1"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            post("/api/students/deactivate", json!({"student_id": "9"})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
