pub mod attendance;
pub mod student;
pub mod teacher;

use actix_web::{
    HttpRequest, HttpResponse,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

/// Envelope `status` field shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Error,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub status: Status,
    #[schema(example = "Student deactivated")]
    pub message: String,
}

fn error_envelope(message: impl Into<String>) -> Value {
    json!({
        "status": "error",
        "message": message.into()
    })
}

/// Fallback for any method a resource does not route.
pub async fn invalid_method() -> HttpResponse {
    HttpResponse::BadRequest().json(error_envelope("Invalid request method"))
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(error_envelope(format!("Invalid request body: {}", err)));
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(error_envelope(format!("Invalid query: {}", err)));
    InternalError::from_response(err, response).into()
}

/// Identity codes arrive as JSON strings or bare numbers depending on the client.
pub fn code_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number identity code, got {}",
            other
        ))),
    }
}

pub fn optional_code_from_json<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number identity code, got {}",
            other
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_app {
    use actix_web::test;

    use crate::config::{Config, StoreBackend};

    pub fn test_config() -> Config {
        Config {
            store_backend: StoreBackend::Memory,
            bulk_max_items: 5,
            ..Config::default()
        }
    }

    /// The full route table over a store, clock pinned to 08:00 on the test school day.
    macro_rules! init_app {
        ($store:expr) => {{
            let config = $crate::api::test_app::test_config();
            let limiters = $crate::routes::RateLimiters::from_config(&config).unwrap();
            let state = actix_web::web::Data::new($crate::state::AppState::new(
                $store,
                &config,
                $crate::service::test_support::fixed_clock($crate::service::test_support::at(
                    $crate::service::test_support::school_day(),
                    8,
                    0,
                    0,
                )),
            ));
            actix_web::test::init_service(
                actix_web::App::new()
                    .wrap(actix_web::middleware::NormalizePath::trim())
                    .app_data(state)
                    .configure(|cfg| $crate::routes::configure(cfg, &config, &limiters)),
            )
            .await
        }};
    }
    pub(crate) use init_app;

    pub fn post(uri: &str, body: serde_json::Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .peer_addr("127.0.0.1:40000".parse().unwrap())
            .set_json(body)
    }

    pub fn get(uri: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(uri)
            .peer_addr("127.0.0.1:40000".parse().unwrap())
    }
}
