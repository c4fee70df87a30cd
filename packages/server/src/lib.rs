//! WebRTC signaling relay library.
//!
//! Peers connect over WebSocket, join a named room and exchange
//! offer / answer / ice-candidate messages through the hub, which routes them
//! to the addressed peer without looking inside the payload.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::ServerConfig;
pub use error::ServerError;
pub use ui::{run, serve};
