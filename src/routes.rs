use crate::{
    AppState,
    handlers, // Import handlers module
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// JSON bodies here are small; 64 KiB is plenty.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/me", get(handlers::me))
        .route(
            "/saved-memes",
            get(handlers::list_saved_memes).post(handlers::toggle_saved_meme),
        )
        .fallback(handlers::not_found)
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state) // Pass the application state
}
