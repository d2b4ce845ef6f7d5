// API layer: handlers and the application router
use crate::handlers::{self as h, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod handlers {
    pub use crate::handlers::*;
}

/// Form posts are small; anything larger is rejected before parsing.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Everything except the health check, with the request body limit applied.
pub fn form_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit-lead", post(h::submit_lead))
        .route("/callback-request", post(h::callback_request))
        .route("/api/v1/translations/:lang", get(h::get_translations))
        .route("/admin/test-whatsapp", get(h::test_whatsapp))
        .layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)))
}

/// Final app: health check merged with `routes`, plus tracing and CORS.
pub fn with_health(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(h::health))
        .merge(routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Application router without rate limiting (the binary adds it, since the
/// governor needs the peer address).
pub fn router(state: Arc<AppState>) -> Router {
    with_health(form_routes(), state)
}
