use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_short_url_handler, health_handler, not_found_handler, redirect_handler,
    stats_handler,
};
use crate::state::AppState;

pub struct App;

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/shorturls", post(create_short_url_handler))
            .route("/shorturls/{shortcode}", get(stats_handler))
            .route("/{shortcode}", get(redirect_handler))
            .fallback(not_found_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
