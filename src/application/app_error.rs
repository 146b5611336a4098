use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Implausible jump: consumption of {consumed} exceeds ceiling of {ceiling}")]
    ImplausibleJump { consumed: Decimal, ceiling: Decimal },

    #[error("Unsupported meter category: {0}")]
    UnsupportedMeterCategory(String),

    #[error("Invalid billing period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid property count: {0}")]
    InvalidPropertyCount(i64),

    #[error("Unrecognized webhook event: {0}")]
    UnrecognizedWebhookEvent(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Determines whether a failure is transient.
    ///
    /// Returns `true` for errors where the caller's retry policy may succeed
    /// (persistence hiccups). Validation failures are permanent: retrying the
    /// same input cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Transient - retry may succeed
            AppError::Database(_) => true,
            AppError::Internal(_) => true,

            // Input-validation failures - won't change with retry
            AppError::InvalidReading(_) => false,
            AppError::ImplausibleJump { .. } => false,
            AppError::UnsupportedMeterCategory(_) => false,
            AppError::InvalidPeriod(_) => false,
            AppError::InvalidPropertyCount(_) => false,
            AppError::UnrecognizedWebhookEvent(_) => false,
            AppError::NotFound => false,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidReading(_) => ErrorCode::InvalidReading,
            AppError::ImplausibleJump { .. } => ErrorCode::ImplausibleJump,
            AppError::UnsupportedMeterCategory(_) => ErrorCode::UnsupportedMeterCategory,
            AppError::InvalidPeriod(_) => ErrorCode::InvalidPeriod,
            AppError::InvalidPropertyCount(_) => ErrorCode::InvalidPropertyCount,
            AppError::UnrecognizedWebhookEvent(_) => ErrorCode::UnrecognizedWebhookEvent,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidReading,
    ImplausibleJump,
    UnsupportedMeterCategory,
    InvalidPeriod,
    InvalidPropertyCount,
    UnrecognizedWebhookEvent,
    DatabaseError,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidReading => "INVALID_READING",
            ErrorCode::ImplausibleJump => "IMPLAUSIBLE_JUMP",
            ErrorCode::UnsupportedMeterCategory => "UNSUPPORTED_METER_CATEGORY",
            ErrorCode::InvalidPeriod => "INVALID_PERIOD",
            ErrorCode::InvalidPropertyCount => "INVALID_PROPERTY_COUNT",
            ErrorCode::UnrecognizedWebhookEvent => "UNRECOGNIZED_WEBHOOK_EVENT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
