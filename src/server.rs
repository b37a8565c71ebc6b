use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(crate::routes::health::health))
        // Link intake
        .route("/links", post(crate::routes::links::add_links))
        // Session lifecycle
        .route("/session/start", post(crate::routes::session::start_session))
        .route(
            "/session/results",
            get(crate::routes::session::session_results),
        )
        // Inbound tester event stream
        .route("/tester/events", post(crate::routes::tester::tester_event))
        // Live intent stream for dashboard clients
        .route("/ws", get(crate::routes::ws::ws_handler))
        // Export
        .route("/export/generate", post(crate::routes::export::generate))
        .route("/export/download", get(crate::routes::export::download))
        .route("/export/publish", post(crate::routes::export::publish))
        // Remote store settings
        .route(
            "/store/config",
            get(crate::routes::store::get_config).post(crate::routes::store::set_config),
        )
        .route("/store/load", post(crate::routes::store::load_hosted))
        // Activity log
        .route("/logs/history", get(crate::routes::logs::log_history))
        .route("/logs/stream", get(crate::routes::logs::log_stream))
        .layer(cors)
        .with_state(state)
}
