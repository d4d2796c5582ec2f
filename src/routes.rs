// src/routes.rs
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/polls", post(handlers::create_poll).get(handlers::get_user_polls))
        .route(
            "/polls/{id}",
            get(handlers::get_poll)
                .put(handlers::update_poll)
                .delete(handlers::delete_poll),
        )
        .route("/polls/{id}/votes", post(handlers::submit_vote))
        .route("/polls/{id}/results", get(handlers::get_poll_results));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
