// src/main.rs
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,poll_core=debug"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = poll_core::start_server().await {
        error!("Failed to start server: {e}");
        std::process::exit(1);
    }
}
