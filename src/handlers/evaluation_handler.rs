use std::sync::Arc;

use actix_web::{error::JsonPayloadError, get, post, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::dto::{
        request::{EvaluationQuery, GenerateEvaluationRequest},
        response::GenerateEvaluationResponse,
    },
};

/// Regenerates the evaluation for a source and personalization, replacing the old one.
#[post("/api/evaluations")]
pub async fn generate_evaluation(
    state: web::Data<Arc<AppState>>,
    request: web::Json<GenerateEvaluationRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    // A malformed profile is reported as such, not as a generic validation error.
    if let Some(profile) = &request.profile {
        profile.ensure_valid()?;
    }
    request.validate()?;

    let document = state
        .evaluation_service
        .generate_evaluation(&request.source_id, &request.personalization_id, request.profile)
        .await?;

    let message = format!(
        "Generated evaluation {} for source '{}'",
        document.id, document.source_id
    );
    Ok(HttpResponse::Created().json(GenerateEvaluationResponse {
        data: document,
        message,
    }))
}

#[get("/api/evaluations/{source_id}")]
pub async fn get_evaluation(
    state: web::Data<Arc<AppState>>,
    source_id: web::Path<String>,
    query: web::Query<EvaluationQuery>,
) -> Result<HttpResponse, AppError> {
    let document = state
        .evaluation_service
        .get_evaluation(&source_id, query.personalization_id.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(document))
}

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
pub async fn health_check_ready(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_health = match &state.db {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let response = serde_json::json!({
        "status": if db_health { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            "mongodb": if db_health { "ok" } else { "error" }
        }
    });

    if db_health {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Body parse failures answer in the same JSON shape as every other error. A profile
/// field rejected while parsing (an unknown band) stays an invalid profile.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let profile_prefix = AppError::InvalidProfile(String::new()).to_string();
    let app_error = match &err {
        JsonPayloadError::Deserialize(inner) => {
            let message = inner.to_string();
            match message.strip_prefix(&profile_prefix) {
                Some(reason) => AppError::InvalidProfile(reason.to_string()),
                None => AppError::ValidationError(message),
            }
        }
        other => AppError::ValidationError(other.to_string()),
    };
    log::debug!("rejected request body: {}", app_error);
    app_error.into()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(generate_evaluation)
        .service(get_evaluation)
        .service(health_check)
        .service(health_check_ready);
}
