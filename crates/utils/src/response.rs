use serde::Serialize;
use ts_rs::TS;

/// Envelope for every JSON response the storefront returns.
///
/// `message` carries the user-facing notice for the action ("Order placed",
/// "Not enough stock"), which the frontend shows as a flash.
#[derive(Debug, Serialize, TS)]
pub struct ApiResponse<T, E = T> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

impl<T, E> ApiResponse<T, E> {
    /// Creates a successful response, with `data` and no message.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error_data: None,
        }
    }

    /// Creates a successful response carrying a flash message.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error_data: None,
        }
    }

    /// Creates an error response, with `message` and no data.
    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error_data: None,
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
