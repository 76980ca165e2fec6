//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] digital_mart_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Identity id is unknown to the provider.
    #[error("user not found")]
    UserNotFound,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Bearer token unknown, revoked, or expired.
    #[error("invalid or expired session")]
    InvalidSession,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// The identity provider or user store could not be reached.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
