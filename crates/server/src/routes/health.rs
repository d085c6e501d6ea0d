use axum::{Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get};
use services::services::database_validator::{DatabaseValidator, ValidationResult};
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

/// GET /api/health
pub async fn health_check(
    State(deployment): State<Deployment>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ValidationResult>>), ApiError> {
    let result = DatabaseValidator::new(deployment.db().pool.clone())
        .validate()
        .await?;
    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let summary = result.summary();
    Ok((status, ResponseJson(ApiResponse::success_with_message(result, summary))))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/health", get(health_check))
}
