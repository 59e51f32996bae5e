//! Page-level error handling - failures render the HTML error pages.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use askama::Template;
use std::fmt;

use crate::templates::{Nav, NotFoundTemplate, ServerErrorTemplate};

/// Application-level error type for the page handlers.
///
/// A non-author edit attempt is not represented here: that case is a
/// documented redirect to the post's detail page, not an error.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::NotFound(detail) => {
                tracing::debug!("404: {}", detail);
                NotFoundTemplate { nav: Nav::anonymous() }.render()
            }
            AppError::BadRequest(detail) => {
                tracing::debug!("400: {}", detail);
                ServerErrorTemplate { nav: Nav::anonymous() }.render()
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ServerErrorTemplate { nav: Nav::anonymous() }.render()
            }
        };

        match body {
            Ok(html) => HttpResponse::build(self.status_code())
                .content_type("text/html; charset=utf-8")
                .body(html),
            // Last resort when even the error template fails
            Err(e) => {
                tracing::error!("Error template failed to render: {}", e);
                HttpResponse::build(self.status_code()).body(self.to_string())
            }
        }
    }
}

impl From<quill_core::error::RepoError> for AppError {
    fn from(err: quill_core::error::RepoError) -> Self {
        match err {
            quill_core::error::RepoError::NotFound => {
                AppError::NotFound("Resource not found".to_string())
            }
            quill_core::error::RepoError::Constraint(msg) => AppError::BadRequest(msg),
            quill_core::error::RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            quill_core::error::RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<quill_core::error::DomainError> for AppError {
    fn from(err: quill_core::error::DomainError) -> Self {
        match err {
            quill_core::error::DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} {} not found", entity_type, id))
            }
            quill_core::error::DomainError::Validation(msg) => AppError::BadRequest(msg),
            quill_core::error::DomainError::Duplicate(msg) => AppError::BadRequest(msg),
            quill_core::error::DomainError::Unauthorized => {
                AppError::BadRequest("Unauthorized".to_string())
            }
            quill_core::error::DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(format!("Template rendering failed: {}", err))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Build an HTML page response.
pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// Build a 302 redirect.
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref().to_string()))
        .finish()
}
