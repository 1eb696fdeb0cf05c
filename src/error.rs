use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use thiserror::Error;
use tracing::{Span, error, warn};

use crate::validation::ValidationResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = match self {
            AppError::Database(err) => {
                error!(error = %message, context = %ctx, db_error = %err, "Database error");
                "database_error"
            }
            AppError::Authentication(msg) => {
                warn!(message = %msg, context = %ctx, "Authentication error");
                "authentication_error"
            }
            AppError::Authorization(msg) => {
                warn!(message = %msg, context = %ctx, "Authorization error");
                "authorization_error"
            }
            AppError::NotFound(msg) => {
                warn!(message = %msg, context = %ctx, "Not found error");
                "not_found_error"
            }
            AppError::Validation(msg) => {
                warn!(message = %msg, context = %ctx, "Validation error");
                "validation_error"
            }
            AppError::InvalidFields(errors) => {
                warn!(fields = ?errors.field_errors().keys().collect::<Vec<_>>(), context = %ctx, "Validation error");
                "validation_error"
            }
            AppError::Conflict(msg) => {
                warn!(message = %msg, context = %ctx, "Conflict error");
                "conflict_error"
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
                "internal_error"
            }
        };

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));

            if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
                current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Database(_) => Status::InternalServerError,
            AppError::Authentication(_) => Status::Unauthorized,
            AppError::Authorization(_) => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Validation(_) | AppError::InvalidFields(_) => Status::BadRequest,
            AppError::Conflict(_) => Status::Conflict,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }

    /// Body sent to the client. Storage and internal failures are not echoed back.
    pub fn to_response_body(&self) -> ValidationResponse {
        match self {
            AppError::Database(_) => ValidationResponse::with_error("server", "A storage error occurred"),
            AppError::Authentication(msg) => ValidationResponse::with_error("authentication", msg),
            AppError::Authorization(msg) => {
                ValidationResponse::with_error("permission", &format!("Permission denied: {}", msg))
            }
            AppError::NotFound(msg) => ValidationResponse::with_error("resource", msg),
            AppError::Validation(msg) => ValidationResponse::with_error("request", msg),
            AppError::InvalidFields(errors) => ValidationResponse::from(errors),
            AppError::Conflict(msg) => ValidationResponse::with_error("resource", msg),
            AppError::Internal(_) => ValidationResponse::with_error("server", "Internal server error"),
        }
    }

    pub fn to_status_with_log(&self, context: &str) -> Status {
        self.log_and_record(context);
        self.status_code()
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status =
            self.to_status_with_log(&format!("Request to {} {}", req.method(), req.uri()));
        Custom(status, Json(self.to_response_body())).respond_to(req)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Cryptography error: {}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {}", error))
    }
}

impl<'r> From<rocket::serde::json::Error<'r>> for AppError {
    fn from(error: rocket::serde::json::Error<'r>) -> Self {
        match error {
            rocket::serde::json::Error::Io(err) => {
                AppError::Internal(format!("Failed to read request body: {}", err))
            }
            rocket::serde::json::Error::Parse(_, err) => {
                AppError::Validation(format!("Malformed request body: {}", err))
            }
        }
    }
}
