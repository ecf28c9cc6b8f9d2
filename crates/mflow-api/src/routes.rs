//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use mflow_models::request::{CAPTION_ENDPOINT, COMPOSE_ENDPOINT, IMAGE_TO_VIDEO_ENDPOINT};

use crate::handlers::{health, submit_caption, submit_compose, submit_image_to_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route(COMPOSE_ENDPOINT, post(submit_compose))
        .route(CAPTION_ENDPOINT, post(submit_caption))
        .route(IMAGE_TO_VIDEO_ENDPOINT, post(submit_image_to_video));

    let downloads = ServeDir::new(state.download_root.as_path());

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(job_routes)
        .nest_service("/download", downloads);

    if let Some(handle) = metrics_handle {
        router = router
            .route("/metrics", get(move || async move { handle.render() }))
            .layer(middleware::from_fn(metrics_middleware));
    }

    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = state.config.max_body_size;

    router
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}
