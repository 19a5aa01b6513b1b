use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("No free session slots")]
    NoSessionSlots,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Database busy")]
    DatabaseBusy,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid filter value for '{field}': {value}")]
    InvalidFilter { field: &'static str, value: String },

    #[error("Requested cursor is invalid: {0}")]
    InvalidCursor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Io(e.to_string())
    }
}
