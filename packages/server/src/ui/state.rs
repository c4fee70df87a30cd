//! Server state shared by all handlers.

use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::ServerConfig,
    domain::{Authenticator, SignalingRepository},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    /// Identity asserted by the fronting service
    pub user_id: Option<String>,
    pub name: Option<String>,
    /// Bearer token for clients that cannot set headers (browsers)
    pub token: Option<String>,
}

/// Shared application state
pub struct AppState {
    /// Repository（データアクセス層の抽象化）
    pub repository: Arc<dyn SignalingRepository>,
    /// Checks credentials before the upgrade
    pub authenticator: Arc<dyn Authenticator>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn SignalingRepository>,
        authenticator: Arc<dyn Authenticator>,
        config: ServerConfig,
    ) -> Self {
        Self {
            repository,
            authenticator,
            config,
        }
    }
}
