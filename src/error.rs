// Error handling for the shop API
// Provides the crate-wide error taxonomy and its HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Main error type for the API
/// Services and handlers return `Result<T, ApiError>`
///
/// Each variant maps to a specific HTTP status code and error code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A referenced user, product, order, coupon, address or reward does not exist
    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    /// Requested quantity exceeds the stock available at reservation time
    #[error("{message}")]
    InsufficientStock { message: String },

    /// Business validation failure (invalid coupon, disallowed transition)
    #[error("{0}")]
    ValidationError(String),

    /// Field-level request validation failure from the validator crate
    #[error("Request validation failed")]
    RequestValidation(validator::ValidationErrors),

    /// Malformed or inconsistent arguments (missing address, foreign reward)
    #[error("{0}")]
    InvalidArgument(String),

    /// Duplicate grant, double redemption, duplicate unique key
    #[error("{message}")]
    Conflict { message: String },

    /// Operation attempted from a state that forbids it
    #[error("{0}")]
    InvalidState(String),

    /// Database operation errors
    /// Sensitive details are filtered from client responses
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Sensitive details are filtered from client responses
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Consistent error response structure
///
/// Every error leaves the API in this shape: a machine-readable `error_code`,
/// a human-readable `message`, optional `details` and the time it happened.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
        }
    }

    pub fn insufficient_stock(product_name: &str) -> Self {
        ApiError::InsufficientStock {
            message: format!("Not enough stock for product: {}", product_name),
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging follows severity:
    /// - error!: database and internal errors (500-level)
    /// - warn!: conflicts and state violations
    /// - debug!: expected client errors (validation, not found, stock)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let response = match self {
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new("NOT_FOUND", self.to_string(), None)
            }
            ApiError::InsufficientStock { message } => {
                debug!("Insufficient stock: {}", message);
                ErrorResponse::new("INSUFFICIENT_STOCK", message.clone(), None)
            }
            ApiError::ValidationError(message) => {
                debug!("Validation error: {}", message);
                ErrorResponse::new("VALIDATION_ERROR", message.clone(), None)
            }
            ApiError::RequestValidation(errors) => {
                debug!("Request validation error: {:?}", errors);
                ErrorResponse::new(
                    "VALIDATION_ERROR",
                    "Request validation failed".to_string(),
                    Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({}))),
                )
            }
            ApiError::InvalidArgument(message) => {
                debug!("Invalid argument: {}", message);
                ErrorResponse::new("INVALID_ARGUMENT", message.clone(), None)
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ErrorResponse::new("CONFLICT", message.clone(), None)
            }
            ApiError::InvalidState(message) => {
                warn!("Invalid state: {}", message);
                ErrorResponse::new("INVALID_STATE", message.clone(), None)
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred".to_string(), None)
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };
        (status, response)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::RequestValidation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::RequestValidation(errors)
    }
}
