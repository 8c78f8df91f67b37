use thiserror::Error;

/// Authorization errors raised before any business logic runs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Actor does not own this resource")]
    AccessDenied,

    #[error("Admin access required")]
    AdminRequired,
}
