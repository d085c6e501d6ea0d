use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::{
    manufacturer_profile::{ManufacturerProfile, UpsertManufacturerProfile},
    record::{Record, RecordSummary, UpdateRecord},
};
use services::services::inventory::{InventoryService, RecordInput};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::SessionContext};

/// GET /api/my-records
pub async fn list_my_records(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> Result<ResponseJson<ApiResponse<Vec<RecordSummary>>>, ApiError> {
    let user = ctx.require_manufacturer()?;
    let records = InventoryService::my_records(&deployment.db().pool, user).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

/// POST /api/my-records
pub async fn add_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<RecordInput>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Record>>), ApiError> {
    let user = ctx.require_manufacturer()?;
    let record = InventoryService::add_record(&deployment.db().pool, user, payload).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(record, "Record added")),
    ))
}

/// PUT /api/my-records/{id}
pub async fn update_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRecord>,
) -> Result<ResponseJson<ApiResponse<Record>>, ApiError> {
    let user = ctx.require_manufacturer()?;
    let record = InventoryService::update_record(&deployment.db().pool, user, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(record, "Record updated")))
}

/// DELETE /api/my-records/{id}
pub async fn delete_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let user = ctx.require_manufacturer()?;
    InventoryService::delete_record(&deployment.db().pool, user, id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message((), "Record deleted")))
}

/// GET /api/my-profile
pub async fn get_profile(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> Result<ResponseJson<ApiResponse<ManufacturerProfile>>, ApiError> {
    let user = ctx.require_manufacturer()?;
    let profile = InventoryService::profile_for(&deployment.db().pool, user).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

/// PUT /api/my-profile
pub async fn update_profile(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertManufacturerProfile>,
) -> Result<ResponseJson<ApiResponse<ManufacturerProfile>>, ApiError> {
    let user = ctx.require_manufacturer()?;
    let profile = InventoryService::update_profile(&deployment.db().pool, user, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(profile, "Profile saved")))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/my-records", get(list_my_records).post(add_record))
        .route("/my-records/{id}", put(update_record).delete(delete_record))
        .route("/my-profile", get(get_profile).put(update_profile))
}
