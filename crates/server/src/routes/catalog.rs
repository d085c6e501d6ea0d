use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{artist::Artist, band::BandWithGenre, genre::Genre};
use services::services::catalog::{
    BandDetail, CatalogService, RecordDetail, RecordPage, RecordQuery, ReleaseDetail,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

/// GET /api/records
pub async fn list_records(
    State(deployment): State<Deployment>,
    Query(query): Query<RecordQuery>,
) -> Result<ResponseJson<ApiResponse<RecordPage>>, ApiError> {
    let page = CatalogService::list_records(&deployment.db().pool, &query).await?;
    Ok(ResponseJson(ApiResponse::success(page)))
}

/// GET /api/records/{id}
pub async fn get_record(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<RecordDetail>>, ApiError> {
    let record = CatalogService::get_record(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub async fn list_genres(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<Genre>>>, ApiError> {
    let genres = CatalogService::list_genres(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(genres)))
}

pub async fn list_bands(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<BandWithGenre>>>, ApiError> {
    let bands = CatalogService::list_bands(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(bands)))
}

pub async fn get_band(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<BandDetail>>, ApiError> {
    let band = CatalogService::get_band(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(band)))
}

pub async fn list_artists(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<Artist>>>, ApiError> {
    let artists = CatalogService::list_artists(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(artists)))
}

pub async fn get_release(
    State(deployment): State<Deployment>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ReleaseDetail>>, ApiError> {
    let release = CatalogService::get_release(&deployment.db().pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(release)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/{id}", get(get_record))
        .route("/genres", get(list_genres))
        .route("/bands", get(list_bands))
        .route("/bands/{id}", get(get_band))
        .route("/artists", get(list_artists))
        .route("/releases/{id}", get(get_release))
}
