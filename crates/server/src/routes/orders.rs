use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::order::{Order, OrderWithItems};
use services::services::orders::OrderService;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::SessionContext};

/// GET /api/orders
pub async fn list_orders(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> Result<ResponseJson<ApiResponse<Vec<Order>>>, ApiError> {
    let user = ctx.require_user()?;
    let orders = OrderService::list_for_user(&deployment.db().pool, user).await?;
    Ok(ResponseJson(ApiResponse::success(orders)))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<OrderWithItems>>, ApiError> {
    let user = ctx.require_user()?;
    let order = OrderService::get(&deployment.db().pool, user, id).await?;
    Ok(ResponseJson(ApiResponse::success(order)))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel_order(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Order>>, ApiError> {
    let user = ctx.require_user()?;
    let order = OrderService::cancel(&deployment.db().pool, user, id).await?;
    let message = format!("Order #{} cancelled", order.short_id());
    Ok(ResponseJson(ApiResponse::success_with_message(order, message)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
}
