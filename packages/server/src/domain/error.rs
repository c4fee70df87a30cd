//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// ConnectionId validation error
    #[error("ConnectionId cannot be empty")]
    ConnectionIdEmpty,

    /// UserId validation error
    #[error("UserId cannot be empty")]
    UserIdEmpty,

    /// UserId too long error
    #[error("UserId cannot exceed {max} bytes (got {actual})")]
    UserIdTooLong { max: usize, actual: usize },

    /// DisplayName too long error
    #[error("DisplayName cannot exceed {max} bytes (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },

    /// RoomId validation error
    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId too long error
    #[error("RoomId cannot exceed {max} bytes (got {actual})")]
    RoomIdTooLong { max: usize, actual: usize },
}

/// Errors reported by the hub registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The connection was never admitted or has already been evicted
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    /// A connection with the same id is already registered
    #[error("Connection already registered: {0}")]
    DuplicateConnection(String),
}

/// Errors returned by an [`Authenticator`](super::auth::Authenticator)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials were present but rejected
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Credentials were required but missing
    #[error("credentials required")]
    MissingCredentials,
}
