pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::{
    ai, auth as auth_handlers, health, metrics, outfit, photos, upload, wardrobe, AppState,
};

/// Multipart framing allowance on top of the file bytes themselves.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

fn api_routes(state: &AppState) -> Router<AppState> {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/me", get(auth_handlers::me))
        .route(
            "/wardrobe/items",
            post(wardrobe::create_item).get(wardrobe::list_items),
        )
        .route(
            "/wardrobe/items/:id",
            put(wardrobe::update_item).delete(wardrobe::delete_item),
        )
        .route(
            "/user/photos",
            post(photos::create_photo).get(photos::list_photos),
        )
        .route("/user/photos/:id", delete(photos::delete_photo))
        .route("/outfit/generate", post(outfit::generate))
        .route("/outfit/history", get(outfit::history))
        .route("/ai/generate", post(ai::generate_image))
        .route(
            "/upload/image",
            post(upload::upload_image)
                .layer(DefaultBodyLimit::max(max_file_size + MULTIPART_OVERHEAD)),
        )
        .route(
            "/upload/images",
            post(upload::upload_images).layer(DefaultBodyLimit::max(
                max_file_size * upload::MAX_FILES_PER_REQUEST + MULTIPART_OVERHEAD,
            )),
        )
}

/// Full application router. Shared by the binary and the HTTP tests.
pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.storage.base_path());

    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_routes(&state))
        .nest_service(storage::local::PUBLIC_PREFIX, uploads)
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::metrics_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
