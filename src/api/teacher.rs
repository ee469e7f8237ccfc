use super::{MessageResponse, Status, code_from_json};
use crate::{error::AppError, model::teacher::TeacherProfile, state::AppState};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterTeacher {
    #[schema(example = "T-100", value_type = String)]
    #[serde(deserialize_with = "code_from_json")]
    pub id: String,
    #[schema(example = "Jose")]
    pub firstname: String,
    #[schema(example = "Rizal")]
    pub lastname: String,
    #[schema(example = "Mathematics")]
    pub subject: String,
}

#[derive(Serialize, ToSchema)]
pub struct TeacherView {
    #[schema(example = "T-100")]
    pub id: String,
    #[schema(example = "Jose Rizal")]
    pub name: String,
    #[schema(example = "Mathematics")]
    pub subject: String,
    pub created: bool,
}

#[derive(Serialize, ToSchema)]
pub struct TeacherResponse {
    pub status: Status,
    #[schema(example = "Teacher Dashboard Loaded")]
    pub message: String,
    pub teacher: TeacherView,
}

/// Register (or refresh) a teacher
#[utoipa::path(
    post,
    path = "/api/login/teacher",
    request_body = RegisterTeacher,
    responses(
        (status = 200, description = "Teacher created or refreshed", body = TeacherResponse),
        (status = 400, description = "Missing or empty field", body = MessageResponse),
        (status = 500, description = "Internal server error", body = MessageResponse)
    ),
    tag = "Teacher"
)]
pub async fn register_teacher(
    state: web::Data<AppState>,
    payload: web::Json<RegisterTeacher>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let profile = TeacherProfile {
        first_name: payload.firstname,
        last_name: payload.lastname,
        subject: payload.subject,
    };

    let (teacher, created) = state.registry.upsert_teacher(&payload.id, profile).await?;

    Ok(HttpResponse::Ok().json(TeacherResponse {
        status: Status::Success,
        message: "Teacher Dashboard Loaded".to_string(),
        teacher: TeacherView {
            id: teacher.teacher_code.clone(),
            name: teacher.full_name(),
            subject: teacher.subject,
            created,
        },
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_app::{init_app, post};
    use crate::service::test_support::memory_store;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn registers_and_refreshes_teacher() {
        let app = init_app!(memory_store());
        let payload = json!({
            "id": "T-100",
            "firstname": "Jose",
            "lastname": "Rizal",
            "subject": "Mathematics"
        });

        let resp = test::call_service(&app, post("/api/login/teacher", payload.clone()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["teacher"]["name"], "Jose Rizal");
        assert_eq!(body["teacher"]["created"], true);

        let resp = test::call_service(&app, post("/api/login/teacher", payload).to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["teacher"]["created"], false);
    }

    #[actix_web::test]
    async fn empty_subject_is_rejected() {
        let app = init_app!(memory_store());
        let resp = test::call_service(
            &app,
            post(
                "/api/login/teacher",
                json!({"id": "T-1", "firstname": "A", "lastname": "B", "subject": ""}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
