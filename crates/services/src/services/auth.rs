//! Account registration, login, and password hashing.

use db::models::{
    user::{CreateUser, User, UserRole},
    web_session::WebSession,
};
use scrypt::{
    Params, Scrypt,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("username is already taken")]
    UsernameTaken,
    #[error("email is already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Maps a failed user insert; a unique violation means a concurrent registration won.
    pub fn from_insert(err: sqlx::Error) -> Self {
        if db::is_unique_violation(&err) {
            AuthError::UsernameTaken
        } else {
            AuthError::Database(err)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateProfileRequest {
    /// Blank or absent clears the saved address.
    pub shipping_address: Option<String>,
}

/// Hashes and verifies passwords as PHC strings.
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(log_n: u8) -> Result<Self, AuthError> {
        let params = Params::new(log_n, Params::RECOMMENDED_R, Params::RECOMMENDED_P, Params::RECOMMENDED_LEN)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt_bytes: [u8; 16] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let hash = Scrypt
            .hash_password_customized(password.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Malformed stored hashes count as a mismatch.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Scrypt.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthService {
    passwords: PasswordService,
}

impl AuthService {
    pub fn new(passwords: PasswordService) -> Self {
        Self { passwords }
    }

    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    pub async fn register(&self, pool: &SqlitePool, request: &RegisterRequest) -> Result<User, AuthError> {
        let username = request.username.trim();
        let email = request.email.trim().to_lowercase();
        validate_registration(username, &email, &request.password, &request.confirm_password)?;

        self.create_user(pool, username, &email, &request.password, UserRole::Customer)
            .await
    }

    /// Creates an account with any role; used by registration, admin screens and seeding.
    pub async fn create_user(
        &self,
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User, AuthError> {
        let data = self.prepare_user(pool, username, email, password, role).await?;
        let user = User::create(pool, &data, Uuid::new_v4())
            .await
            .map_err(AuthError::from_insert)?;
        info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Checks that the username and email are free and hashes the password.
    /// Nothing is written; the caller inserts the row, possibly inside its own transaction.
    pub async fn prepare_user(
        &self,
        pool: &SqlitePool,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<CreateUser, AuthError> {
        if User::find_by_username(pool, username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if User::find_by_email(pool, email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        Ok(CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: self.passwords.hash(password)?,
            role,
            shipping_address: None,
        })
    }

    /// Checks credentials. Unknown email and wrong password are indistinguishable.
    pub async fn authenticate(&self, pool: &SqlitePool, request: &LoginRequest) -> Result<User, AuthError> {
        let email = request.email.trim();
        let Some(user) = User::find_by_email(pool, email).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !self.passwords.verify(&request.password, &user.password_hash) {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Authenticates and binds the user to the session under a fresh session id.
    ///
    /// The anonymous cart carries over. Returns the user and the new session.
    pub async fn login(
        &self,
        pool: &SqlitePool,
        session_id: Uuid,
        request: &LoginRequest,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(User, WebSession), AuthError> {
        let user = self.authenticate(pool, request).await?;
        let session = match WebSession::rotate(pool, session_id, Uuid::new_v4(), Some(user.id), expires_at).await? {
            Some(session) => session,
            // the old session vanished (swept mid-request): start clean
            None => {
                let session = WebSession::create(pool, Uuid::new_v4(), expires_at).await?;
                WebSession::rotate(pool, session.id, Uuid::new_v4(), Some(user.id), expires_at)
                    .await?
                    .unwrap_or(session)
            }
        };
        info!(user_id = %user.id, "User logged in");
        Ok((user, session))
    }

    /// Ends the session entirely; the cart goes with it.
    pub async fn logout(&self, pool: &SqlitePool, session_id: Uuid) -> Result<(), AuthError> {
        WebSession::delete(pool, session_id).await?;
        Ok(())
    }

    pub async fn update_shipping_address(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
        shipping_address: Option<&str>,
    ) -> Result<User, AuthError> {
        let address = shipping_address.map(str::trim).filter(|a| !a.is_empty());
        User::update_shipping_address(pool, user_id, address).await?;
        User::find_by_id(pool, user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::Validation("username is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::Validation("a valid email is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirm_password {
        return Err(AuthError::Validation("passwords do not match".to_string()));
    }
    Ok(())
}
