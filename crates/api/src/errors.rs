use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Instant;
use vigil_dns_domain::DomainError;

/// Per-request timer inserted by the middleware; every JSON reply carries
/// the elapsed seconds as `took`.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimer(pub Instant);

impl RequestTimer {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn took(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::now()
    }
}

/// Uniform error reply: `{error: {key, message, hint?}, took}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub key: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub took: f64,
}

impl ApiError {
    pub fn new(status: StatusCode, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            key,
            message: message.into(),
            hint: None,
            took: 0.0,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Unauthorized",
        )
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_timer(mut self, timer: &RequestTimer) -> Self {
        self.took = timer.took();
        self
    }

    pub fn from_domain(err: DomainError, timer: &RequestTimer) -> Self {
        let e = match err {
            DomainError::BadRequest(m) => Self::bad_request(m),
            DomainError::Unauthorized => Self::unauthorized(),
            DomainError::TooManyRequests(hint) => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "too_many_requests",
                "Too many requests",
            )
            .with_hint(hint),
            DomainError::NoSessionSlots => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "api_seats_exceeded",
                "API seats exceeded",
            )
            .with_hint("increase api.max_sessions"),
            DomainError::InvalidCursor(hint) => {
                Self::bad_request("Requested cursor is invalid").with_hint(hint)
            }
            DomainError::InvalidFilter { field, value } => {
                Self::bad_request(format!("Requested {field} is invalid")).with_hint(value)
            }
            DomainError::DatabaseBusy => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_busy",
                "Database is busy",
            ),
            DomainError::Database(m) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "Database error",
            )
            .with_hint(m),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            )
            .with_hint(other.to_string()),
        };
        e.with_timer(timer)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "key": self.key,
                "message": self.message,
                "hint": self.hint,
            },
            "took": self.took,
        });
        (self.status, Json(body)).into_response()
    }
}
