//! Application-wide error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::documents::aggregate::DocumentError;
use crate::money::MoneyError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input, reported against a single field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness clash, reported like a field validation failure.
    #[error("{field}: {message}")]
    Duplicate { field: String, message: String },

    /// Wrong, used or expired one-time code. Deliberately says nothing about which.
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("reset code has not been verified")]
    NotVerified,

    /// Company profile is missing or still holds placeholders.
    #[error("company profile setup required")]
    SetupRequired,

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Duplicate { .. } | Self::SetupRequired => StatusCode::CONFLICT,
            Self::NotVerified => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::NotVerified => "NOT_VERIFIED",
            Self::SetupRequired => "PROFILE_SETUP_REQUIRED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Persistence(_) => "OPERATION_FAILED",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, field) = match &self {
            Self::Validation { field, message } | Self::Duplicate { field, message } => {
                (message.clone(), Some(field.clone()))
            }
            Self::Persistence(e) => {
                error!(error = ?e, "operation failed");
                ("Operation failed, please try again".to_string(), None)
            }
            other => (other.to_string(), None),
        };
        let body = ErrorBody {
            error: self.error_code(),
            message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

impl From<MoneyError> for AppError {
    fn from(e: MoneyError) -> Self {
        Self::validation("amount", e.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        let field = match &e {
            DocumentError::InvalidLineItem { .. } => "items",
            DocumentError::InvalidDocumentType(_) => "document_type",
            DocumentError::InvalidTaxRate(_) => "tax_rate",
        };
        Self::validation(field, e.to_string())
    }
}
