//! Server configuration.
//!
//! Every flag can also be set from the environment.

use clap::Parser;

use crate::domain::DEFAULT_OUTBOUND_CAPACITY;

/// WebRTC signaling relay
#[derive(Debug, Clone, Parser)]
#[command(name = "kairo-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "KAIRO_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind (0 picks a free port)
    #[arg(long, env = "KAIRO_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Capacity of each connection's outbound queue
    #[arg(long, env = "KAIRO_QUEUE_CAPACITY", default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    pub queue_capacity: usize,

    /// Origin allowed to open a WebSocket (repeatable; none = any origin)
    #[arg(
        long = "allowed-origin",
        env = "KAIRO_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,

    /// Reject upgrades that carry no `user_id` query parameter
    #[arg(long, env = "KAIRO_REQUIRE_IDENTITY")]
    pub require_identity: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "KAIRO_LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether an upgrade from `origin` is accepted
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        origin.is_some_and(|origin| self.allowed_origins.iter().any(|allowed| allowed == origin))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            queue_capacity: DEFAULT_OUTBOUND_CAPACITY,
            allowed_origins: Vec::new(),
            require_identity: false,
            log_level: "debug".to_string(),
        }
    }
}
