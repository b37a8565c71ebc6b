use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::session::SessionState;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session_state: SessionState,
    pub account_count: usize,
    pub has_exportable_config: bool,
    pub store_configured: bool,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let session_state = state.coordinator.read().await.state();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_state,
        account_count: state.accounts.read().await.len(),
        has_exportable_config: state.export_config.read().await.is_some(),
        store_configured: state.store.read().await.is_some(),
    })
}
