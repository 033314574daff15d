use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid email format")]
    InvalidEmailFormat,

    /// Deliberately covers not-found, already-used and expired tokens alike so
    /// a caller cannot probe which condition rejected a token.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    RateLimited,
    InvalidCredentials,
    InvalidEmailFormat,
    InvalidOrExpiredToken,
    EmailDeliveryFailed,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidEmailFormat => "INVALID_EMAIL_FORMAT",
            ErrorCode::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            ErrorCode::EmailDeliveryFailed => "EMAIL_DELIVERY_FAILED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
