//! Role checks shared by the route guards and the services.

use db::models::user::{User, UserRole};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("login required")]
    Unauthenticated,
    #[error("access denied")]
    Forbidden,
}

pub fn require_user(user: Option<&User>) -> Result<&User, AccessError> {
    user.ok_or(AccessError::Unauthenticated)
}

pub fn require_role<'a>(user: Option<&'a User>, roles: &[UserRole]) -> Result<&'a User, AccessError> {
    let user = require_user(user)?;
    if roles.contains(&user.role) {
        Ok(user)
    } else {
        Err(AccessError::Forbidden)
    }
}

pub fn require_admin(user: Option<&User>) -> Result<&User, AccessError> {
    require_role(user, &[UserRole::Admin])
}

/// Manufacturer screens are also open to admins.
pub fn require_manufacturer(user: Option<&User>) -> Result<&User, AccessError> {
    require_role(user, &[UserRole::Manufacturer, UserRole::Admin])
}
