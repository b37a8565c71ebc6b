use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::links::parse_batch;
use crate::log_capture::{LogLevel, LogSource};
use crate::state::SharedState;
use crate::store::{self, StoreConfig};

#[derive(Deserialize)]
pub struct StoreConfigRequest {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

/// POST /store/config — configure the remote store. Owner/repo are cached
/// locally for convenience; the token is held in memory only.
pub async fn set_config(
    State(state): State<SharedState>,
    Json(req): Json<StoreConfigRequest>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    if req.owner.trim().is_empty() || req.repo.trim().is_empty() || req.token.trim().is_empty() {
        return Err(DashboardError::Validation(
            "owner, repo and token are all required".to_string(),
        ));
    }

    state
        .db
        .save_store_settings(req.owner.trim(), req.repo.trim())
        .map_err(|e| DashboardError::Db(e.to_string()))?;

    *state.store.write().await = Some(StoreConfig {
        owner: req.owner.trim().to_string(),
        repo: req.repo.trim().to_string(),
        token: req.token,
    });

    state
        .logs
        .emit(
            LogSource::Store,
            LogLevel::Info,
            format!("Remote store configured: {}/{}", req.owner.trim(), req.repo.trim()),
        )
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Store configured and saved locally",
    })))
}

/// GET /store/config — current store coordinates for the settings form.
/// Falls back to the persisted owner/repo when no token has been supplied
/// this session.
pub async fn get_config(State(state): State<SharedState>) -> Json<serde_json::Value> {
    if let Some(cfg) = state.store.read().await.as_ref() {
        return Json(serde_json::json!({
            "configured": true,
            "owner": cfg.owner,
            "repo": cfg.repo,
        }));
    }

    match state.db.load_store_settings() {
        Ok(Some((owner, repo))) => Json(serde_json::json!({
            "configured": false,
            "owner": owner,
            "repo": repo,
        })),
        _ => Json(serde_json::json!({
            "configured": false,
            "owner": null,
            "repo": null,
        })),
    }
}

#[derive(Deserialize)]
pub struct LoadRequest {
    pub path: String,
}

/// POST /store/load — pull a hosted file and run any links found in it
/// through the normal intake path.
pub async fn load_hosted(
    State(state): State<SharedState>,
    Json(req): Json<LoadRequest>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    let cfg = state
        .store
        .read()
        .await
        .clone()
        .ok_or(DashboardError::StoreNotConfigured)?;

    let (content, _sha) = store::fetch_file(&state.http_client, &cfg, &req.path).await?;
    let batch = parse_batch(&content);
    if batch.accounts.is_empty() {
        return Err(DashboardError::Validation(format!(
            "No usable links found in {}",
            req.path
        )));
    }

    let new_accounts = batch.accounts.len();
    let total_accounts = {
        let mut accounts = state.accounts.write().await;
        accounts.extend(batch.accounts);
        accounts.len()
    };

    state
        .logs
        .emit(
            LogSource::Store,
            LogLevel::Info,
            format!(
                "Loaded {} account(s) from {}/{}:{}",
                new_accounts, cfg.owner, cfg.repo, req.path
            ),
        )
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "new_accounts": new_accounts,
        "invalid_links": batch.invalid,
        "total_accounts": total_accounts,
    })))
}
