use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<RwLock<AppState>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/wait-time", get(handlers::get_wait_time))
        .route("/api/dates/reconstruct", get(handlers::get_reconstructed_date))
        .route(
            "/api/forecast",
            get(handlers::get_forecast).post(handlers::post_forecast),
        )
        .route("/api/imputation", post(handlers::post_imputation))
        .route("/api/insights", post(handlers::post_insights))
        .with_state(state)
}
