use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Form UI
        .route("/", get(handlers::index))
        // Health check
        .route("/api/health", get(handlers::health_check))
        // Submit a question and wait for the assistant's reply
        .route("/api/ask", post(handlers::ask))
}
