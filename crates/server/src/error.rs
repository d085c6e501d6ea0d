use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    access::AccessError, admin::AdminError, auth::AuthError, cart::CartError,
    catalog::CatalogError, checkout::CheckoutError, config::ConfigError,
    database_validator::DatabaseValidationError, inventory::InventoryError, orders::OrderError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Admin(#[from] AdminError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("session middleware did not run")]
    MissingSession,
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Database(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::UsernameTaken | AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
    }
}

fn inventory_status(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        InventoryError::Validation(_) => StatusCode::BAD_REQUEST,
        InventoryError::NoProfile => StatusCode::FORBIDDEN,
        InventoryError::NotFound => StatusCode::NOT_FOUND,
        InventoryError::Referenced => StatusCode::CONFLICT,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(_)
            | ApiError::Config(_)
            | ApiError::DatabaseValidation(_)
            | ApiError::MissingSession => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Access(AccessError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Access(AccessError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Auth(err) => auth_status(err),
            ApiError::Cart(err) => match err {
                CartError::Database(_) | CartError::SessionNotFound => StatusCode::INTERNAL_SERVER_ERROR,
                CartError::RecordNotFound(_) => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity { .. } | CartError::Overflow => StatusCode::BAD_REQUEST,
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
            },
            ApiError::Checkout(err) => match err {
                CheckoutError::Database(_) | CheckoutError::SessionNotFound => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                CheckoutError::EmptyCart
                | CheckoutError::MissingAddress
                | CheckoutError::InvalidPaymentMethod(_)
                | CheckoutError::Overflow => StatusCode::BAD_REQUEST,
                CheckoutError::RecordUnavailable { .. } | CheckoutError::InsufficientStock { .. } => {
                    StatusCode::CONFLICT
                }
            },
            ApiError::Catalog(err) => match err {
                CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            ApiError::Order(err) => match err {
                OrderError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::InvalidTransition { .. } | OrderError::Conflict => StatusCode::CONFLICT,
            },
            ApiError::Inventory(err) => inventory_status(err),
            ApiError::Admin(err) => match err {
                AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AdminError::Auth(err) => auth_status(err),
                AdminError::Inventory(err) => inventory_status(err),
                AdminError::Validation(_) => StatusCode::BAD_REQUEST,
                AdminError::NotFound(_) => StatusCode::NOT_FOUND,
                AdminError::Conflict(_) => StatusCode::CONFLICT,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AccessError::Unauthenticated).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(AccessError::Forbidden).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(CheckoutError::EmptyCart).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CheckoutError::InsufficientStock {
                record_id: Uuid::new_v4(),
                title: "X".to_string(),
                requested: 2,
                available: 1,
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AdminError::Auth(AuthError::EmailTaken)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CatalogError::NotFound("record")).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = ApiError::from(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
