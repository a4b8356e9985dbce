use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    InternalServerError(String),
    ValidationError(String),
    LookupError(String),
    SyncError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::LookupError(msg) => write!(f, "Lookup Error: {}", msg),
            ApiError::SyncError(msg) => write!(f, "Sync Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::LookupError(_) => HttpResponse::BadGateway().json(error_response),
            ApiError::SyncError(_) => HttpResponse::BadGateway().json(error_response),
            ApiError::InternalServerError(_) => {
                HttpResponse::InternalServerError().json(error_response)
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Domain-specific constructors
impl ApiError {
    pub fn product_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Product with ID '{}' not found", id))
    }

    pub fn batch_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Batch with ID '{}' not found", id))
    }

    pub fn barcode_not_found(code: &str) -> Self {
        ApiError::NotFound(format!("No entry remembered for barcode '{}'", code))
    }

    pub fn invalid_backup_format(detail: &str) -> Self {
        ApiError::BadRequest(format!("Unrecognized backup format: {}", detail))
    }

    pub fn lookup_unavailable() -> Self {
        ApiError::BadRequest(
            "Product lookup is not configured (missing API key)".to_string(),
        )
    }

    pub fn sync_not_connected() -> Self {
        ApiError::BadRequest("No active cloud session".to_string())
    }

    pub fn cloud_session_expired() -> Self {
        ApiError::Unauthorized("Cloud session rejected; reconnect and try again".to_string())
    }
}
