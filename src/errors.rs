use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid learner profile: {0}")]
    InvalidProfile(String),

    #[error("Text generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Invalid choice set request: {0}")]
    InvalidChoiceSetRequest(String),

    #[error("Evaluation incomplete: {0}")]
    IncompleteEvaluation(String),

    #[error("Concurrent regeneration conflict: {0}")]
    ConcurrentRegenerationConflict(String),

    #[error("Generation run cancelled: {0}")]
    Cancelled(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidProfile(_) => "INVALID_PROFILE",
            AppError::GenerationUnavailable(_) => "GENERATION_UNAVAILABLE",
            AppError::InvalidChoiceSetRequest(_) => "INVALID_CHOICE_SET_REQUEST",
            AppError::IncompleteEvaluation(_) => "INCOMPLETE_EVALUATION",
            AppError::ConcurrentRegenerationConflict(_) => "CONCURRENT_REGENERATION_CONFLICT",
            AppError::Cancelled(_) => "CANCELLED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Only failures of the external generation capability are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::GenerationUnavailable(_))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
            AppError::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidChoiceSetRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IncompleteEvaluation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ConcurrentRegenerationConflict(_) => StatusCode::CONFLICT,
            AppError::Cancelled(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.status_code().as_u16(),
            kind: self.error_code(),
        })
    }
}

const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                AppError::AlreadyExists(write_error.message.clone())
            }
            _ => AppError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
