//! Back-office endpoints. Every handler requires the admin role.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::{
    artist::{Artist, UpsertArtist},
    band::{Band, BandWithGenre, UpsertBand},
    composition::{Composition, UpsertComposition},
    genre::{Genre, UpsertGenre},
    manufacturer_profile::{ManufacturerProfile, ManufacturerWithUser},
    order::Order,
    record::{CreateRecord, Record, RecordSummary, UpdateRecord},
    release::{Release, UpsertRelease},
    user::User,
};
use services::services::{
    admin::{AdminService, ChangeRole, CreateManufacturer, Dashboard},
    orders::{OrderListQuery, OrderService, UpdateOrderStatus},
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::SessionContext};

type ApiResult<T> = Result<ResponseJson<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, ResponseJson<ApiResponse<T>>), ApiError>;

fn created<T>(data: T, message: &str) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(data, message)),
    ))
}

fn deleted(message: &str) -> ApiResult<()> {
    Ok(ResponseJson(ApiResponse::success_with_message((), message)))
}

/// GET /api/admin/dashboard
pub async fn dashboard(State(deployment): State<Deployment>, ctx: SessionContext) -> ApiResult<Dashboard> {
    ctx.require_admin()?;
    let dashboard = AdminService::dashboard(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

// Genres

pub async fn list_genres(State(deployment): State<Deployment>, ctx: SessionContext) -> ApiResult<Vec<Genre>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_genres(&deployment.db().pool).await?,
    )))
}

pub async fn create_genre(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertGenre>,
) -> Created<Genre> {
    ctx.require_admin()?;
    created(
        AdminService::create_genre(&deployment.db().pool, &payload).await?,
        "Genre created",
    )
}

pub async fn update_genre(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertGenre>,
) -> ApiResult<Genre> {
    ctx.require_admin()?;
    let genre = AdminService::update_genre(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(genre, "Genre updated")))
}

pub async fn delete_genre(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_genre(&deployment.db().pool, id).await?;
    deleted("Genre deleted")
}

// Artists

pub async fn list_artists(State(deployment): State<Deployment>, ctx: SessionContext) -> ApiResult<Vec<Artist>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_artists(&deployment.db().pool).await?,
    )))
}

pub async fn create_artist(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertArtist>,
) -> Created<Artist> {
    ctx.require_admin()?;
    created(
        AdminService::create_artist(&deployment.db().pool, &payload).await?,
        "Artist created",
    )
}

pub async fn update_artist(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertArtist>,
) -> ApiResult<Artist> {
    ctx.require_admin()?;
    let artist = AdminService::update_artist(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(artist, "Artist updated")))
}

pub async fn delete_artist(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_artist(&deployment.db().pool, id).await?;
    deleted("Artist deleted")
}

// Bands

pub async fn list_bands(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> ApiResult<Vec<BandWithGenre>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_bands(&deployment.db().pool).await?,
    )))
}

pub async fn create_band(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertBand>,
) -> Created<Band> {
    ctx.require_admin()?;
    created(
        AdminService::create_band(&deployment.db().pool, &payload).await?,
        "Band created",
    )
}

pub async fn update_band(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertBand>,
) -> ApiResult<Band> {
    ctx.require_admin()?;
    let band = AdminService::update_band(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(band, "Band updated")))
}

pub async fn delete_band(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_band(&deployment.db().pool, id).await?;
    deleted("Band deleted")
}

// Compositions

pub async fn list_compositions(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> ApiResult<Vec<Composition>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_compositions(&deployment.db().pool).await?,
    )))
}

pub async fn create_composition(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertComposition>,
) -> Created<Composition> {
    ctx.require_admin()?;
    created(
        AdminService::create_composition(&deployment.db().pool, &payload).await?,
        "Composition created",
    )
}

pub async fn update_composition(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertComposition>,
) -> ApiResult<Composition> {
    ctx.require_admin()?;
    let composition = AdminService::update_composition(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        composition,
        "Composition updated",
    )))
}

pub async fn delete_composition(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_composition(&deployment.db().pool, id).await?;
    deleted("Composition deleted")
}

// Releases

pub async fn list_releases(State(deployment): State<Deployment>, ctx: SessionContext) -> ApiResult<Vec<Release>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_releases(&deployment.db().pool).await?,
    )))
}

pub async fn create_release(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpsertRelease>,
) -> Created<Release> {
    ctx.require_admin()?;
    created(
        AdminService::create_release(&deployment.db().pool, &payload).await?,
        "Release created",
    )
}

pub async fn update_release(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpsertRelease>,
) -> ApiResult<Release> {
    ctx.require_admin()?;
    let release = AdminService::update_release(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(release, "Release updated")))
}

pub async fn delete_release(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_release(&deployment.db().pool, id).await?;
    deleted("Release deleted")
}

// Records

pub async fn list_records(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> ApiResult<Vec<RecordSummary>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_records(&deployment.db().pool).await?,
    )))
}

pub async fn create_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<CreateRecord>,
) -> Created<Record> {
    ctx.require_admin()?;
    created(
        AdminService::create_record(&deployment.db().pool, &payload).await?,
        "Record created",
    )
}

pub async fn update_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRecord>,
) -> ApiResult<Record> {
    ctx.require_admin()?;
    let record = AdminService::update_record(&deployment.db().pool, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(record, "Record updated")))
}

pub async fn delete_record(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    ctx.require_admin()?;
    AdminService::delete_record(&deployment.db().pool, id).await?;
    deleted("Record deleted")
}

// Manufacturers

pub async fn list_manufacturers(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
) -> ApiResult<Vec<ManufacturerWithUser>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_manufacturers(&deployment.db().pool).await?,
    )))
}

pub async fn create_manufacturer(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<CreateManufacturer>,
) -> Created<ManufacturerProfile> {
    ctx.require_admin()?;
    let profile =
        AdminService::create_manufacturer(&deployment.db().pool, deployment.auth(), &payload).await?;
    created(profile, "Manufacturer created")
}

// Users

pub async fn list_users(State(deployment): State<Deployment>, ctx: SessionContext) -> ApiResult<Vec<User>> {
    ctx.require_admin()?;
    Ok(ResponseJson(ApiResponse::success(
        AdminService::list_users(&deployment.db().pool).await?,
    )))
}

/// PUT /api/admin/users/{id}/role
pub async fn change_user_role(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRole>,
) -> ApiResult<User> {
    let admin = ctx.require_admin()?;
    let user = AdminService::change_role(&deployment.db().pool, admin, id, payload.role).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(user, "Role updated")))
}

pub async fn delete_user(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let admin = ctx.require_admin()?;
    AdminService::delete_user(&deployment.db().pool, admin, id).await?;
    deleted("User deleted")
}

// Orders

/// GET /api/admin/orders?status=processing
pub async fn list_orders(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<Order>> {
    ctx.require_admin()?;
    let orders = OrderService::list_all(&deployment.db().pool, query.status).await?;
    Ok(ResponseJson(ApiResponse::success(orders)))
}

/// PUT /api/admin/orders/{id}/status
pub async fn update_order_status(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatus>,
) -> ApiResult<Order> {
    ctx.require_admin()?;
    let order = OrderService::update_status(&deployment.db().pool, id, payload.status).await?;
    let message = format!("Order #{} is now {}", order.short_id(), order.status);
    Ok(ResponseJson(ApiResponse::success_with_message(order, message)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    let inner = Router::new()
        .route("/dashboard", get(dashboard))
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/{id}", put(update_genre).delete(delete_genre))
        .route("/artists", get(list_artists).post(create_artist))
        .route("/artists/{id}", put(update_artist).delete(delete_artist))
        .route("/bands", get(list_bands).post(create_band))
        .route("/bands/{id}", put(update_band).delete(delete_band))
        .route("/compositions", get(list_compositions).post(create_composition))
        .route(
            "/compositions/{id}",
            put(update_composition).delete(delete_composition),
        )
        .route("/releases", get(list_releases).post(create_release))
        .route("/releases/{id}", put(update_release).delete(delete_release))
        .route("/records", get(list_records).post(create_record))
        .route("/records/{id}", put(update_record).delete(delete_record))
        .route("/manufacturers", get(list_manufacturers).post(create_manufacturer))
        .route("/users", get(list_users))
        .route("/users/{id}", axum::routing::delete(delete_user))
        .route("/users/{id}/role", put(change_user_role))
        .route("/orders", get(list_orders))
        .route("/orders/{id}/status", put(update_order_status));

    Router::new().nest("/admin", inner)
}
