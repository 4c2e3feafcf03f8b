use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailExists,

    #[error("User not found")]
    UserNotFound,

    #[error("User photo not found")]
    PhotoNotFound,

    #[error("Clothing item {0} not found")]
    ClothingNotFound(Uuid),

    #[error("Wardrobe item not found")]
    ItemNotFound,

    #[error("Daily generation limit of {0} reached")]
    UsageLimitExceeded(i64),

    #[error("Wardrobe limit of {0} items reached")]
    WardrobeLimitExceeded(i64),

    #[error("No file uploaded")]
    NoFile,

    #[error("No files uploaded")]
    NoFiles,

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("File larger than {0} bytes")]
    FileTooLarge(usize),

    #[error("Outfit generation failed: {0}")]
    Generation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Auth(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound
            | AppError::PhotoNotFound
            | AppError::ClothingNotFound(_)
            | AppError::ItemNotFound => StatusCode::NOT_FOUND,
            AppError::UsageLimitExceeded(_) | AppError::WardrobeLimitExceeded(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::EmailExists
            | AppError::NoFile
            | AppError::NoFiles
            | AppError::InvalidFileType
            | AppError::FileTooLarge(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Generation(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code the frontend pattern-matches for localized messages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Storage(_) => "UPLOAD_FAILED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "UNAUTHORIZED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::EmailExists => "EMAIL_EXISTS",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::PhotoNotFound => "PHOTO_NOT_FOUND",
            AppError::ClothingNotFound(_) => "CLOTHING_NOT_FOUND",
            AppError::ItemNotFound => "ITEM_NOT_FOUND",
            AppError::UsageLimitExceeded(_) => "USAGE_LIMIT_EXCEEDED",
            AppError::WardrobeLimitExceeded(_) => "WARDROBE_LIMIT_EXCEEDED",
            AppError::NoFile => "NO_FILE",
            AppError::NoFiles => "NO_FILES",
            AppError::InvalidFileType => "INVALID_FILE_TYPE",
            AppError::FileTooLarge(_) => "FILE_TOO_LARGE",
            AppError::Generation(_) => "AI_GENERATION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database operation failed".to_string(),
            AppError::Storage(_) => "Failed to store uploaded file".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Validation(msg) | AppError::Auth(msg) | AppError::Generation(msg) => {
                msg.clone()
            }
            AppError::UsageLimitExceeded(limit) => format!(
                "Daily limit reached. Free users can generate {} outfits per day. \
                 Please upgrade to premium for unlimited generations.",
                limit
            ),
            AppError::WardrobeLimitExceeded(limit) => format!(
                "Free users can have up to {} items. Please upgrade to premium for unlimited storage.",
                limit
            ),
            AppError::InvalidFileType => {
                "Invalid file type. Only JPEG, PNG, and WebP images are allowed.".to_string()
            }
            AppError::FileTooLarge(max) => format!(
                "File size exceeds the maximum limit of {}MB",
                max / (1024 * 1024)
            ),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Storage(msg) => tracing::error!("Storage error: {}", msg),
            AppError::Internal(e) => tracing::error!("Internal error: {:#}", e),
            AppError::Generation(msg) => tracing::warn!("Outfit generation failed: {}", msg),
            _ => {}
        }

        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": self.client_message(),
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
