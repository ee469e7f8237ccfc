use crate::{
    api::{attendance, invalid_method, json_error_handler, query_error_handler, student, teacher},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route limiters, built once so every worker shares the same buckets.
#[derive(Clone)]
pub struct RateLimiters {
    pub mark: Limiter,
    pub register: Limiter,
    pub default: Limiter,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            mark: Arc::new(build_limiter(config.rate_mark_per_min)?),
            register: Arc::new(build_limiter(config.rate_register_per_min)?),
            default: Arc::new(build_limiter(config.rate_default_per_min)?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {} per minute", requests_per_min))?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    cfg.service(
        web::scope(&config.api_prefix)
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .wrap(limiters.default.clone())
            .service(
                web::scope("/login")
                    // /login/student
                    .service(
                        web::resource("/student")
                            .wrap(limiters.register.clone())
                            .route(web::post().to(student::register_student))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /login/teacher
                    .service(
                        web::resource("/teacher")
                            .wrap(limiters.register.clone())
                            .route(web::post().to(teacher::register_teacher))
                            .default_service(web::route().to(invalid_method)),
                    ),
            )
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::get().to(student::list_students))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /students/update
                    .service(
                        web::resource("/update")
                            .route(web::post().to(student::update_student))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /students/deactivate
                    .service(
                        web::resource("/deactivate")
                            .route(web::post().to(student::deactivate_student))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /students/{student_id}
                    .service(
                        web::resource("/{student_id}")
                            .route(web::get().to(student::get_student))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /students/{student_id}/history
                    .service(
                        web::resource("/{student_id}/history")
                            .route(web::get().to(student::student_history))
                            .default_service(web::route().to(invalid_method)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance/mark
                    .service(
                        web::resource("/mark")
                            .wrap(limiters.mark.clone())
                            .route(web::post().to(attendance::mark_attendance))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /attendance/manual
                    .service(
                        web::resource("/manual")
                            .wrap(limiters.mark.clone())
                            .route(web::post().to(attendance::mark_manual))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /attendance/bulk
                    .service(
                        web::resource("/bulk")
                            .wrap(limiters.mark.clone())
                            .route(web::post().to(attendance::mark_bulk))
                            .default_service(web::route().to(invalid_method)),
                    )
                    // /attendance/daily
                    .service(
                        web::resource("/daily")
                            .route(web::get().to(attendance::daily_attendance))
                            .default_service(web::route().to(invalid_method)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_clamped_instead_of_rejected() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
