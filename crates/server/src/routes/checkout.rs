use axum::{Json, Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::post};
use db::models::order::OrderWithItems;
use services::services::checkout::{CheckoutRequest, CheckoutService};
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError, middleware::SessionContext};

/// POST /api/checkout
/// Turns the session cart into an order in one transaction.
pub async fn checkout(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<OrderWithItems>>), ApiError> {
    let user = ctx.require_user()?;
    let order = CheckoutService::checkout(&deployment.db().pool, ctx.session_id, user, &payload).await?;
    let message = CheckoutService::confirmation_message(&order);
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(order, message)),
    ))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().route("/checkout", post(checkout))
}
