//! Query-parameter authenticator.
//!
//! Trusts `user_id` / `name` as handed over by the fronting service, which is
//! responsible for having validated them. A connection admitted with a
//! `user_id` can only join rooms under that same `user_id`.

use async_trait::async_trait;

use crate::domain::{
    AuthError, Authenticator, Credentials, DisplayName, Identity, UserId,
};

/// Authenticator that takes the identity from the upgrade query string
#[derive(Debug, Clone, Default)]
pub struct QueryAuthenticator {
    /// Reject upgrades that carry no `user_id`
    require_identity: bool,
}

impl QueryAuthenticator {
    pub fn new(require_identity: bool) -> Self {
        Self { require_identity }
    }
}

#[async_trait]
impl Authenticator for QueryAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<Identity>, AuthError> {
        let Some(user_id) = credentials.user_id.clone() else {
            if self.require_identity {
                return Err(AuthError::MissingCredentials);
            }
            return Ok(None);
        };

        let user_id =
            UserId::new(user_id).map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
        let name = DisplayName::new(credentials.name.clone().unwrap_or_default())
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
        Ok(Some(Identity::new(user_id, name)))
    }
}
