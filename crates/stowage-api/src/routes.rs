//! Route configuration and setup

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use stowage_core::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::X_ERROR;
use crate::handlers;
use crate::state::AppState;

/// Build the application router. HEAD requests are answered by the same
/// handlers as GET with the body stripped, which is the info endpoint.
pub fn build_router(state: AppState) -> Router {
    let cors = setup_cors(&state.config);

    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route("/version", get(handlers::health::version))
        .route("/v1/files/{id}", get(handlers::files::get_file))
        .route(
            "/v1/files/{id}/presignedurl",
            get(handlers::presigned::get_presigned_url),
        )
        .route(
            "/v1/files/{id}/presignedurl/content",
            get(handlers::presigned::get_presigned_content),
        )
        .route("/v1/ops/list-orphans", post(handlers::ops::list_orphans))
        .route("/v1/ops/delete-orphans", post(handlers::ops::delete_orphans))
        .route(
            "/v1/ops/list-broken-metadata",
            post(handlers::ops::list_broken_metadata),
        )
        .route(
            "/v1/ops/delete-broken-metadata",
            post(handlers::ops::delete_broken_metadata),
        )
        .route(
            "/v1/ops/list-not-uploaded",
            post(handlers::ops::list_not_uploaded),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Setup CORS configuration. Conditional and caching headers must be
/// exposed or browsers cannot read them cross-origin.
fn setup_cors(config: &Config) -> CorsLayer {
    let exposed = [
        header::CONTENT_LENGTH,
        header::CONTENT_TYPE,
        header::CONTENT_DISPOSITION,
        header::CACHE_CONTROL,
        header::ETAG,
        header::LAST_MODIFIED,
        X_ERROR.clone(),
    ];
    let methods = [Method::GET, Method::HEAD, Method::POST, Method::OPTIONS];

    if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers(exposed)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
            .expose_headers(exposed)
    }
}
