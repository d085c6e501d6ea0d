use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use db::models::user::User;
use services::services::auth::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use utils::response::ApiResponse;

use crate::{
    Deployment,
    error::ApiError,
    middleware::{SESSION_COOKIE, SessionContext, session_cookie},
};

/// POST /api/auth/register
pub async fn register(
    State(deployment): State<Deployment>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = deployment.auth().register(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        user,
        "Registration successful",
    )))
}

/// POST /api/auth/login
/// Binds the account to the session under a new session id; the cart carries over.
pub async fn login(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<ApiResponse<User>>), ApiError> {
    let (user, session) = deployment
        .auth()
        .login(
            &deployment.db().pool,
            ctx.session_id,
            &payload,
            deployment.session_expiry(),
        )
        .await?;
    let message = format!("Welcome, {}", user.username);
    Ok((
        jar.add(session_cookie(&deployment, session.id)),
        ResponseJson(ApiResponse::success_with_message(user, message)),
    ))
}

/// POST /api/auth/logout
pub async fn logout(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), ApiError> {
    deployment.auth().logout(&deployment.db().pool, ctx.session_id).await?;
    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        ResponseJson(ApiResponse::success_with_message((), "Logged out")),
    ))
}

/// GET /api/auth/me
pub async fn me(ctx: SessionContext) -> ResponseJson<ApiResponse<Option<User>>> {
    ResponseJson(ApiResponse::success(ctx.user))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(deployment): State<Deployment>,
    ctx: SessionContext,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = ctx.require_user()?;
    let user = deployment
        .auth()
        .update_shipping_address(
            &deployment.db().pool,
            user.id,
            payload.shipping_address.as_deref(),
        )
        .await?;
    Ok(ResponseJson(ApiResponse::success_with_message(user, "Profile updated")))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/me", get(me))
            .route("/profile", put(update_profile)),
    )
}
