use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use services::services::cart::{AddToCart, CartService, CartView, SetCartQuantity};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::SessionContext};

fn line_title(view: &CartView, record_id: Uuid) -> &str {
    view.lines
        .iter()
        .find(|line| line.record_id == record_id)
        .map(|line| line.title.as_str())
        .unwrap_or("Record")
}

/// GET /api/cart
pub async fn get_cart(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = CartService::view(&deployment.db().pool, ctx.session_id).await?;
    Ok(ResponseJson(ApiResponse::success(view)))
}

/// DELETE /api/cart
pub async fn clear_cart(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let pool = &deployment.db().pool;
    CartService::clear(pool, ctx.session_id).await?;
    let view = CartService::view(pool, ctx.session_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(view, "Cart cleared")))
}

/// POST /api/cart/items/{record_id}
pub async fn add_item(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<AddToCart>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let quantity = payload.quantity.unwrap_or(1);
    let view = CartService::add(&deployment.db().pool, ctx.session_id, record_id, quantity).await?;
    let message = format!("Added \"{}\" to cart", line_title(&view, record_id));
    Ok(ResponseJson(ApiResponse::success_with_message(view, message)))
}

/// PUT /api/cart/items/{record_id}
pub async fn set_item_quantity(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<SetCartQuantity>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let view = CartService::set_quantity(
        &deployment.db().pool,
        ctx.session_id,
        record_id,
        payload.quantity,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(view, "Cart updated")))
}

/// DELETE /api/cart/items/{record_id}
pub async fn remove_item(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(record_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<CartView>>, ApiError> {
    let (view, removed) = CartService::remove(&deployment.db().pool, ctx.session_id, record_id).await?;
    let message = if removed {
        "Removed from cart"
    } else {
        "That record was not in your cart"
    };
    Ok(ResponseJson(ApiResponse::success_with_message(view, message)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/cart",
        Router::new().route("/", get(get_cart).delete(clear_cart)).route(
            "/items/{record_id}",
            post(add_item).put(set_item_quantity).delete(remove_item),
        ),
    )
}
