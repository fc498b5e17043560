//! Error taxonomy for Tourguard.
//!
//! Every failure surfaced by the service maps onto one coarse [`ErrorKind`],
//! which in turn decides the HTTP status code of the `{message, error?}`
//! envelope rendered by [`AppError::into_response`].

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::model::ComplaintStatus;

/// Coarse classification used for status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resolution notes are required to resolve a complaint")]
    MissingResolutionNotes,

    #[error("No contact information available: provide contactInfo or add a phone/email to your profile")]
    MissingContactInfo,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Complaint cannot be cancelled in status {0}")]
    NotCancellable(ComplaintStatus),

    #[error("Feedback has already been submitted for this complaint")]
    AlreadyRated,

    #[error("Feedback is only accepted for resolved or closed complaints (current status: {0})")]
    NotEligibleForFeedback(ComplaintStatus),

    #[error("Complaint was modified concurrently, reload and retry")]
    ConcurrentModification,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Validation(_)
            | AppError::MissingResolutionNotes
            | AppError::MissingContactInfo => ErrorKind::Validation,
            AppError::InvalidTransition { .. }
            | AppError::NotCancellable(_)
            | AppError::AlreadyRated
            | AppError::NotEligibleForFeedback(_)
            | AppError::ConcurrentModification => ErrorKind::Conflict,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Database(_) | AppError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable error code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::MissingResolutionNotes => "MISSING_RESOLUTION_NOTES",
            AppError::MissingContactInfo => "MISSING_CONTACT_INFO",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::NotCancellable(_) => "NOT_CANCELLABLE",
            AppError::AlreadyRated => "ALREADY_RATED",
            AppError::NotEligibleForFeedback(_) => "NOT_ELIGIBLE_FOR_FEEDBACK",
            AppError::ConcurrentModification => "CONCURRENT_MODIFICATION",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Database(_) | AppError::Serialization(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error envelope: `{message, error?}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = if kind == ErrorKind::Internal {
            // Store details stay in the logs.
            warn!(error = %self, "Request failed with internal error");
            ErrorResponse {
                message: "Internal server error".to_string(),
                error: None,
            }
        } else {
            ErrorResponse {
                message: self.to_string(),
                error: Some(self.code().to_string()),
            }
        };

        (kind.status_code(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
