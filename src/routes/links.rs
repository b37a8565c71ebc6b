use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::DashboardError;
use crate::links::parse_batch;
use crate::log_capture::{LogLevel, LogSource};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AddLinksRequest {
    pub links: String,
}

/// POST /links — extract and parse raw connection links, extending the
/// working account set. Invalid links are reported, not fatal.
pub async fn add_links(
    State(state): State<SharedState>,
    Json(req): Json<AddLinksRequest>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    if req.links.trim().is_empty() {
        return Err(DashboardError::Validation(
            "No links provided".to_string(),
        ));
    }

    let batch = parse_batch(&req.links);
    if batch.accounts.is_empty() && batch.invalid.is_empty() {
        return Err(DashboardError::Validation(
            "No valid VPN links found".to_string(),
        ));
    }
    if batch.accounts.is_empty() {
        return Err(DashboardError::Validation(
            "No valid accounts could be parsed from the links".to_string(),
        ));
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
            LogSource::Dashboard,
            LogLevel::Info,
            format!(
                "Added {} account(s) ({} invalid link(s) skipped), {} total",
                new_accounts,
                batch.invalid.len(),
                total_accounts
            ),
        )
        .await;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Added {} accounts. Ready to test!", new_accounts),
        "new_accounts": new_accounts,
        "invalid_links": batch.invalid,
        "total_accounts": total_accounts,
        "ready_to_test": true,
    })))
}
