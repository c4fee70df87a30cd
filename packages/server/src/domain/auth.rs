//! Authentication seam.
//!
//! The relay never authenticates envelopes. Credentials are checked once,
//! before the WebSocket upgrade, by whatever [`Authenticator`] the server is
//! built with.

use async_trait::async_trait;

use super::{connection::Identity, error::AuthError};

/// Credentials presented on the upgrade request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// `Authorization: Bearer <token>` value, if any
    pub bearer_token: Option<String>,
    /// `user_id` query parameter, if any
    pub user_id: Option<String>,
    /// `name` query parameter, if any
    pub name: Option<String>,
}

/// Resolves upgrade credentials to an identity.
///
/// `Ok(None)` admits the connection anonymously; its identity is then bound
/// by its first `join-room`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<Identity>, AuthError>;
}
