use thiserror::Error;

use super::auth::AuthError;

/// Request-level failure taxonomy.
///
/// Per-recipient and per-template failures never become an `AppError`;
/// they are captured into batch results or logged by the reconciliation
/// workers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("You dont have an access for this route")]
    AccessDenied,

    #[error("Some params is invalid: {0}")]
    BadRequest(String),

    #[error("Authorization is failed: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Short machine-readable kind, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::AccessDenied => "access_denied",
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row".to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationRequired => {
                AppError::Unauthorized("Authentication required".to_string())
            }
            AuthError::InvalidToken => AppError::Unauthorized("Invalid authorization".to_string()),
            AuthError::AccessDenied | AuthError::AdminRequired => AppError::AccessDenied,
        }
    }
}
