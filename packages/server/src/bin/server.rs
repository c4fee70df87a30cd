//! WebRTC signaling relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kairo-server -- --port 8080
//! ```

use clap::Parser;
use kairo_server::ServerConfig;
use kairo_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    // Run the server
    if let Err(e) = kairo_server::run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
