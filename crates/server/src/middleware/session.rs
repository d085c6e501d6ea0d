//! Cookie-addressed server-side sessions.
//!
//! Every request gets a [`SessionContext`]. A missing, unknown or expired
//! cookie starts a fresh anonymous session and the cookie is issued on the
//! way out, unless the handler already set one (login and logout do).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use db::models::{user::User, web_session::WebSession};
use services::services::access::{self, AccessError};
use tracing::debug;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

pub const SESSION_COOKIE: &str = "vinyl_session";

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user: Option<User>,
}

impl SessionContext {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&User, AccessError> {
        access::require_user(self.user.as_ref())
    }

    pub fn require_admin(&self) -> Result<&User, AccessError> {
        access::require_admin(self.user.as_ref())
    }

    pub fn require_manufacturer(&self) -> Result<&User, AccessError> {
        access::require_manufacturer(self.user.as_ref())
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or(ApiError::MissingSession)
    }
}

pub fn session_cookie(deployment: &Deployment, session_id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(deployment.config().secure_cookies)
        .build()
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{SESSION_COOKIE}=");
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| value.to_str().is_ok_and(|value| value.starts_with(&prefix)))
}

pub async fn load_session(
    State(deployment): State<Deployment>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let pool = &deployment.db().pool;
    let expires_at = deployment.session_expiry();

    let existing = match jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        Some(id) => WebSession::find_active(pool, id, Utc::now()).await?,
        None => None,
    };
    let (session, fresh) = match existing {
        Some(session) => {
            WebSession::touch(pool, session.id, expires_at).await?;
            (session, false)
        }
        None => {
            let session = WebSession::create(pool, Uuid::new_v4(), expires_at).await?;
            debug!(session_id = %session.id, "Started new session");
            (session, true)
        }
    };

    let user = match session.user_id {
        Some(user_id) => User::find_by_id(pool, user_id).await?,
        None => None,
    };
    request.extensions_mut().insert(SessionContext {
        session_id: session.id,
        user,
    });

    let response = next.run(request).await;
    if !fresh || sets_session_cookie(&response) {
        return Ok(response);
    }
    Ok((jar.add(session_cookie(&deployment, session.id)), response).into_response())
}
