use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::export::{self, ExportSource};
use crate::log_capture::{LogLevel, LogSource};
use crate::metrics::aggregate;
use crate::session::{SessionIntent, SessionState};
use crate::state::SharedState;
use crate::store;

/// POST /export/generate — user-requested materialization. Only a Completed
/// session with successes passes the gate.
pub async fn generate(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    let (session_id, artifact, bundle) = {
        let coordinator = state.coordinator.read().await;
        let session = coordinator.session().ok_or(DashboardError::NoSession)?;
        if session.state != SessionState::Completed {
            return Err(DashboardError::NoExport);
        }
        let metrics = aggregate(&session.records, session.total);
        let artifact = export::evaluate(&metrics, session.state, ExportSource::Manual)
            .ok_or(DashboardError::NoExport)?;
        let bundle = export::materialize(&session.records);
        (session.id.clone(), artifact, bundle)
    };

    *state.export_config.write().await = Some(bundle);
    state
        .logs
        .emit(
            LogSource::Session,
            LogLevel::Info,
            format!(
                "Generated export with {} account(s)",
                artifact.account_count
            ),
        )
        .await;
    state.broadcast(SessionIntent::ExportAvailable {
        session_id,
        artifact: artifact.clone(),
    });

    Ok(Json(serde_json::json!({
        "success": true,
        "artifact": artifact,
    })))
}

/// GET /export/download — serve the materialized bundle as a file download.
pub async fn download(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, DashboardError> {
    let content = state
        .export_config
        .read()
        .await
        .clone()
        .ok_or(DashboardError::NoExport)?;

    let filename = export::export_filename(Utc::now());
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    ))
}

#[derive(Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
}

/// POST /export/publish — push the materialized bundle to the remote store.
pub async fn publish(
    State(state): State<SharedState>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    let content = state
        .export_config
        .read()
        .await
        .clone()
        .ok_or(DashboardError::NoExport)?;
    let cfg = state
        .store
        .read()
        .await
        .clone()
        .ok_or(DashboardError::StoreNotConfigured)?;

    let path = req
        .path
        .unwrap_or_else(|| export::export_filename(Utc::now()));
    let message = req
        .commit_message
        .unwrap_or_else(|| "Update VPN configuration".to_string());

    // Updating an existing path needs its current blob sha; a structured
    // miss means the path is new.
    let sha = match store::fetch_file(&state.http_client, &cfg, &path).await {
        Ok((_, sha)) => Some(sha),
        Err(DashboardError::Upstream(_)) => None,
        Err(e) => return Err(e),
    };

    store::publish(
        &state.http_client,
        &cfg,
        &path,
        &content,
        &message,
        sha.as_deref(),
    )
    .await?;

    state
        .logs
        .emit(
            LogSource::Store,
            LogLevel::Info,
            format!("Published export to {}/{}:{}", cfg.owner, cfg.repo, path),
        )
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "path": path,
    })))
}
