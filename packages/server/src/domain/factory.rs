//! Domain factories for creating domain entities and value objects.

use super::{ConnectionId, error::ValueObjectError};

/// Prefix of every generated connection identifier.
pub const CONNECTION_ID_PREFIX: &str = "conn_";

/// Factory for generating ConnectionId instances.
///
/// Identifiers come from a random UUID v4 (OS CSPRNG), so a client in one
/// room cannot guess the connection ids used in another.
pub struct ConnectionIdFactory;

impl ConnectionIdFactory {
    /// Generate a new random ConnectionId.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<ConnectionId, ValueObjectError> {
        let uuid = uuid::Uuid::new_v4();
        ConnectionId::new(format!("{CONNECTION_ID_PREFIX}{}", uuid.simple()))
    }
}
