use axum::extract::State;
use axum::Json;

use crate::error::DashboardError;
use crate::log_capture::{LogLevel, LogSource};
use crate::metrics::aggregate;
use crate::record::AccountTestRecord;
use crate::state::SharedState;
use crate::tester;

/// POST /session/start — fix the working account set into a fresh session
/// and hand the run off to the external tester.
pub async fn start_session(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, DashboardError> {
    let accounts = state.accounts.read().await.clone();
    if accounts.is_empty() {
        return Err(DashboardError::Validation(
            "No accounts to test".to_string(),
        ));
    }

    let initial: Vec<AccountTestRecord> = accounts
        .iter()
        .enumerate()
        .map(|(i, a)| AccountTestRecord::waiting(i, &a.tag, &a.vpn_type))
        .collect();

    let (session_id, total, intents) = {
        let mut coordinator = state.coordinator.write().await;
        let intents = coordinator.submit(initial)?;
        let session = coordinator.session().expect("session exists after submit");
        (session.id.clone(), session.total, intents)
    };

    for intent in intents {
        state.broadcast(intent);
    }
    state
        .logs
        .emit(
            LogSource::Session,
            LogLevel::Info,
            format!("Session {} started over {} account(s)", session_id, total),
        )
        .await;

    // Handoff failure ends the session it was meant to feed.
    if let Err(e) =
        tester::submit_test_run(&state.http_client, &state.config.tester_url, &accounts).await
    {
        let intents = {
            let mut coordinator = state.coordinator.write().await;
            coordinator.on_error(e.to_string())
        };
        for intent in intents {
            state.broadcast(intent);
        }
        state
            .logs
            .emit(
                LogSource::Tester,
                LogLevel::Error,
                format!("Failed to submit test run: {}", e),
            )
            .await;
        return Err(e);
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "session_id": session_id,
        "total": total,
    })))
}

/// GET /session/results — current session snapshot for page (re)loads.
pub async fn session_results(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let coordinator = state.coordinator.read().await;
    let has_export = state.export_config.read().await.is_some();
    let account_count = state.accounts.read().await.len();

    match coordinator.session() {
        Some(session) => {
            let metrics = aggregate(&session.records, session.total);
            Json(serde_json::json!({
                "session_id": session.id,
                "state": session.state,
                "total": session.total,
                "results": session.records,
                "metrics": metrics,
                "has_exportable_config": has_export,
            }))
        }
        None => {
            // Nothing live; restore the most recent finished run so a page
            // load after a restart still shows its results.
            let last = state.db.latest_session().ok().flatten();
            let results = last
                .as_ref()
                .and_then(|s| serde_json::from_str::<serde_json::Value>(&s.results_json).ok())
                .unwrap_or_else(|| serde_json::json!([]));
            Json(serde_json::json!({
                "session_id": last.as_ref().map(|s| s.session_id.clone()),
                "state": "idle",
                "total": account_count,
                "results": results,
                "metrics": null,
                "has_exportable_config": has_export,
            }))
        }
    }
}
