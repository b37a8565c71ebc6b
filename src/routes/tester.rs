use axum::extract::State;
use axum::Json;
use tracing::warn;

use crate::export;
use crate::log_capture::{LogLevel, LogSource};
use crate::session::{CompletionSummary, SessionIntent};
use crate::state::SharedState;
use crate::tester::TesterEvent;

/// POST /tester/events — inbound event stream from the external tester.
/// Events are applied in arrival order; anything arriving outside a Running
/// session is acknowledged but ignored (`accepted: false`), since the tester
/// may redeliver or race a UI-driven reset.
pub async fn tester_event(
    State(state): State<SharedState>,
    Json(event): Json<TesterEvent>,
) -> Json<serde_json::Value> {
    let intents = {
        let mut coordinator = state.coordinator.write().await;
        match event {
            TesterEvent::Progress { results, .. } => coordinator.on_snapshot(results),
            TesterEvent::Completed {
                total,
                successful,
                results,
            } => coordinator.on_completed(CompletionSummary {
                total,
                successful,
                results,
            }),
            TesterEvent::Error { message } => coordinator.on_error(message),
        }
    };

    let accepted = !intents.is_empty();
    for intent in intents {
        apply_side_effects(&state, &intent).await;
        state.broadcast(intent);
    }

    Json(serde_json::json!({ "accepted": accepted }))
}

/// Persistence and materialization hang off the emitted intents so the
/// coordinator itself stays pure.
async fn apply_side_effects(state: &SharedState, intent: &SessionIntent) {
    match intent {
        SessionIntent::Progress { .. } => {}
        SessionIntent::Completed {
            successful, total, ..
        } => {
            {
                let coordinator = state.coordinator.read().await;
                if let Some(session) = coordinator.session() {
                    if let Err(e) = state.db.save_session_summary(session, *successful) {
                        warn!("Failed to persist session summary: {}", e);
                    }
                }
            }
            state
                .logs
                .emit(
                    LogSource::Session,
                    LogLevel::Info,
                    format!("Testing complete: {}/{} successful", successful, total),
                )
                .await;
        }
        SessionIntent::ExportAvailable { artifact, .. } => {
            let bundle = {
                let coordinator = state.coordinator.read().await;
                coordinator
                    .session()
                    .map(|session| export::materialize(&session.records))
            };
            if let Some(bundle) = bundle {
                *state.export_config.write().await = Some(bundle);
            }
            state
                .logs
                .emit(
                    LogSource::Session,
                    LogLevel::Info,
                    format!(
                        "Export available: {} account(s) qualified",
                        artifact.account_count
                    ),
                )
                .await;
        }
        SessionIntent::Error { message, .. } => {
            state
                .logs
                .emit(
                    LogSource::Tester,
                    LogLevel::Error,
                    format!("Testing failed: {}", message),
                )
                .await;
        }
    }
}
