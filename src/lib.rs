//! Poll and vote backend.
//!
//! Authenticated users create polls, vote once per poll, and manage the polls
//! they own. Admins may delete any poll.
//!
//! # Request flow
//! - Input is validated first, so malformed requests never reach the store
//! - The caller is resolved from the identity headers set by the gateway
//! - Mutations pass the ownership guard after the poll is confirmed to exist
//! - Every response is an `{ error, data }` envelope
//!
//! # Voting
//! One row per `(poll_id, user_id)`, written with a single
//! `INSERT ... ON CONFLICT DO UPDATE`. A second vote replaces the first.
//!
//! # Running
//! ```sh
//! DATABASE_URL=postgres://localhost/polls cargo run
//! ```
//! Without `DATABASE_URL` polls live in memory and vanish on restart.
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{
    header::{HeaderName, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum_server::Handle;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

pub mod authz;
pub mod cache;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod policy;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;

use config::Config;
use error::{ConfigError, StartupError};
use identity::{USER_EMAIL_HEADER, USER_ID_HEADER, USER_ROLE_HEADER};
use state::AppState;

pub async fn start_server() -> Result<(), StartupError> {
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::from_config(&config).await?;
    let cors = cors_layer(&config)?;
    let app = routes::create_routes(state, cors);

    let address: SocketAddr = config.address().parse()?;
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("Server running on {address}");
    axum_server::bind(address)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn cors_layer(config: &Config) -> Result<CorsLayer, ConfigError> {
    let origin = match &config.cors_allowed_origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                key: "CORS_ALLOWED_ORIGIN".to_string(),
                message: e.to_string(),
            })?;
            AllowOrigin::exact(value)
        }
        None => {
            warn!("CORS_ALLOWED_ORIGIN not set, cross-origin requests cannot carry identity headers");
            AllowOrigin::from(Any)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list(allowed_headers(config)))
        .max_age(Duration::from_secs(60 * 60)))
}

/// Identity headers are only accepted cross-origin from the one trusted origin.
fn allowed_headers(config: &Config) -> Vec<HeaderName> {
    let mut headers = vec![CONTENT_TYPE];
    if config.cors_allowed_origin.is_some() {
        headers.extend([
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(USER_EMAIL_HEADER),
            HeaderName::from_static(USER_ROLE_HEADER),
        ]);
    }
    headers
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
