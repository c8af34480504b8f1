// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use uuid::Uuid;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 404 - malformed identifier in the URL
    InvalidId(String),

    // 404 - uniqueness constraint violation
    Duplicate(String),

    // 404 - payload validation, aggregating all field messages
    Validation(Vec<String>),

    // 500 Internal Server Error; detail suppressed outside development
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_)
            | ApiError::InvalidId(_)
            | ApiError::Duplicate(_)
            | ApiError::Validation(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Envelope status field: "fail" for client errors, "error" for server errors
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// Operational errors are expected failures whose message is safe for clients
    pub fn is_operational(&self) -> bool {
        !matches!(self, ApiError::Internal(_))
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::InvalidId(value) => format!("Invalid identifier: \"{}\"", value),
            ApiError::Duplicate(value) => format!("Duplicate value: \"{}\" already exists!", value),
            ApiError::Validation(messages) => messages.join(" "),
            ApiError::Internal(detail) => {
                if crate::is_development!() {
                    detail.clone()
                } else {
                    "Something went wrong!".to_string()
                }
            }
        }
    }

    /// Convert to the client envelope: { status, message }
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "status": self.status_label(),
            "message": self.message(),
        });

        // Development keeps the internal detail visible alongside the envelope
        if crate::is_development!() {
            if let ApiError::Internal(detail) = self {
                body["error"] = Value::String(detail.clone());
            }
        }

        body
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

/// Parse a path id, translating failures into the invalid-identifier envelope
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

// Convert other error types to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("No document found with that ID"),
            sqlx::Error::Database(db_err) => {
                // Unique violation carries the offending key in its detail
                if db_err.code().as_deref() == Some("23505") {
                    let detail = db_err
                        .constraint()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| db_err.message().to_string());
                    return ApiError::Duplicate(detail);
                }
                tracing::error!("Database error: {}", db_err.message());
                ApiError::internal(format!("Database error: {}", db_err.message()))
            }
            _ => {
                tracing::error!("SQLx error: {}", err);
                ApiError::internal(format!("Database error: {}", err))
            }
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
            other => {
                tracing::error!("Database manager error: {}", other);
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl From<crate::filter::error::FilterError> for ApiError {
    fn from(err: crate::filter::error::FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        ApiError::unauthorized("Invalid or expired token! Please log back in.")
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        for (field, field_errors) in errors.field_errors() {
            for e in field_errors {
                match &e.message {
                    Some(msg) => messages.push(msg.to_string()),
                    None => messages.push(format!("Invalid value for field '{}'.", field)),
                }
            }
        }
        messages.sort();
        ApiError::Validation(messages)
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal(format!("Password hashing error: {}", err))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if !self.is_operational() {
            tracing::error!("Unhandled internal error: {}", self.message());
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
