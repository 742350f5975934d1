//! # Error Handling for Resource Controllers
//!
//! Every controller action returns `Result<_, ApiError>`. The error knows its
//! HTTP status and the sanitized message sent to clients:
//!
//! - validation and not-found errors become structured `406`/`404` bodies
//! - persistence and runtime faults become a generic `500` whose internal
//!   details are logged with `tracing` and never sent to clients
//!
//! In debug mode the [`render_errors`] middleware swaps the generic `500`
//! body for the error kind, message, origin and backtrace frames:
//!
//! ```rust,ignore
//! let app = registry
//!     .with_error_config(ErrorConfig::from_env())
//!     .into_router();
//! ```

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::Location;

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

use crate::config::ErrorConfig;
use crate::validation::ValidationErrors;

const DATABASE_MESSAGE: &str = "Error in database connection or query";
const INTERNAL_MESSAGE: &str = "Whoops! Something went wrong.";

/// Where a server-side error was raised, kept for debug rendering.
#[derive(Debug, Clone)]
pub struct Origin {
    pub line: String,
    pub trace: Vec<String>,
}

impl Origin {
    #[track_caller]
    fn here() -> Self {
        let location = Location::caller();
        Self {
            line: format!("{}:{}", location.file(), location.line()),
            trace: capture_trace(),
        }
    }
}

/// Backtrace frames that point at a source file, as `file:line` strings.
///
/// Captured regardless of `RUST_BACKTRACE`; only server errors pay for it.
/// Frames without symbol information are skipped.
fn capture_trace() -> Vec<String> {
    let backtrace = Backtrace::force_capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    backtrace
        .to_string()
        .lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .map(str::to_string)
        .collect()
}

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - the key did not resolve to an entity
    NotFound {
        /// Resource name (e.g. "post")
        resource: String,
        /// Key that was looked up
        id: Option<String>,
    },

    /// 400 Bad Request - malformed input
    BadRequest { message: String },

    /// 403 Forbidden - rejected by a request validator
    Forbidden { message: String },

    /// 405 Method Not Allowed - the action makes no sense for this resource
    NotPermitted { message: String },

    /// 406 Not Acceptable - field validation failed, nothing was written
    ValidationFailed { errors: ValidationErrors },

    /// 409 Conflict - unique constraint violation
    Conflict { message: String },

    /// 500 - storage failure (details logged, not exposed)
    Database { internal: DbErr, origin: Origin },

    /// 500 - any other runtime fault (details logged, not exposed)
    Internal {
        message: String,
        internal: Option<String>,
        origin: Origin,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a 405 error for an action the resource does not support
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::not_permitted("Cannot restore non soft deletable object"));
    /// ```
    pub fn not_permitted(message: impl Into<String>) -> Self {
        Self::NotPermitted {
            message: message.into(),
        }
    }

    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a 500 error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[track_caller]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            internal: err,
            origin: Origin::here(),
        }
    }

    /// Create a 500 error with optional internal details
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::internal("Failed to sync tags", Some(err.to_string())));
    /// ```
    #[track_caller]
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
            origin: Origin::here(),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotPermitted { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::ValidationFailed { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Forbidden { message }
            | Self::NotPermitted { message }
            | Self::Conflict { message } => message.clone(),
            Self::ValidationFailed { errors } => errors.to_string(),
            Self::Database { .. } => DATABASE_MESSAGE.to_string(),
            Self::Internal { .. } => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Full details for debug rendering; `None` for client errors.
    #[must_use]
    pub fn details(&self) -> Option<ErrorDetails> {
        match self {
            Self::Database { internal, origin } => Some(ErrorDetails {
                error: internal.to_string(),
                exception: db_err_kind(internal).to_string(),
                line: origin.line.clone(),
                trace: origin.trace.clone(),
            }),
            Self::Internal {
                message,
                internal,
                origin,
            } => Some(ErrorDetails {
                error: internal.clone().unwrap_or_else(|| message.clone()),
                exception: "Internal".to_string(),
                line: origin.line.clone(),
                trace: origin.trace.clone(),
            }),
            _ => None,
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, origin } => {
                tracing::error!(error = ?internal, at = %origin.line, "Database error occurred");
            }
            Self::Internal {
                message,
                internal,
                origin,
            } => {
                tracing::error!(
                    message = %message,
                    details = ?internal,
                    at = %origin.line,
                    "Internal error occurred"
                );
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

fn db_err_kind(err: &DbErr) -> &'static str {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => "DbErr::Conn",
        DbErr::Exec(_) => "DbErr::Exec",
        DbErr::Query(_) => "DbErr::Query",
        DbErr::RecordNotFound(_) => "DbErr::RecordNotFound",
        DbErr::RecordNotInserted => "DbErr::RecordNotInserted",
        DbErr::RecordNotUpdated => "DbErr::RecordNotUpdated",
        DbErr::Json(_) => "DbErr::Json",
        DbErr::Type(_) => "DbErr::Type",
        DbErr::Custom(_) => "DbErr::Custom",
        _ => "DbErr",
    }
}

/// Debug-mode body for 500 responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub error: String,
    pub exception: String,
    pub line: String,
    pub trace: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorBody<'a> {
    Message(String),
    Fields(&'a ValidationErrors),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: ErrorBody::Fields(errors),
            },
            _ => ErrorResponse {
                error: ErrorBody::Message(self.user_message()),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(details) = self.details() {
            response.extensions_mut().insert(details);
        }
        response
    }
}

/// Top-level error renderer.
///
/// Masked 500 responses carry their [`ErrorDetails`] in the response
/// extensions; in debug mode they replace the body.
pub async fn render_errors(
    State(config): State<ErrorConfig>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let details = response.extensions_mut().remove::<ErrorDetails>();
    match details {
        Some(details) if config.debug => (response.status(), Json(details)).into_response(),
        _ => response,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `RecordNotFound` becomes 404, unique violations 409, everything else a
/// masked 500.
impl From<DbErr> for ApiError {
    #[track_caller]
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            let resource = msg.split_whitespace().next().unwrap_or("Resource");
            return Self::not_found(resource, None);
        }
        if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
            return Self::conflict("Duplicate entry");
        }
        Self::database(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }
}

impl From<serde_json::Error> for ApiError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::internal("Failed to serialize resource", Some(err.to_string()))
    }
}
