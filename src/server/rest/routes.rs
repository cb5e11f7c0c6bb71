use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::server::rest::{handlers, logging_middleware::request_logging_middleware, openapi::ApiDoc};
use crate::shared::models::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Paths match the ones the web frontend already calls
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/listusb", get(handlers::devices::list_devices))
        .route("/getcontainers", get(handlers::containers::list_containers))
        .route("/newcontainer", post(handlers::containers::create_container))
        .route("/deletecontainer", post(handlers::containers::delete_container))
        .route("/restartcontainer", post(handlers::containers::restart_container))
        .route("/renamecontainer", post(handlers::containers::rename_container))
        .route("/reconcile", post(handlers::containers::reconcile))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> StatusCode {
    StatusCode::OK
}
