use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use clap::Parser;
use tower::util::ServiceExt;

use vortex_dashboard::config::{CliArgs, DashboardConfig};
use vortex_dashboard::db::DashboardDb;
use vortex_dashboard::record::AccountTestRecord;
use vortex_dashboard::server::build_router;
use vortex_dashboard::state::{DashboardState, SharedState};

fn make_app() -> (tempfile::TempDir, SharedState, Router) {
    let dir = tempfile::tempdir().unwrap();
    // Tester URL points at a closed port so handoff attempts fail fast.
    let args = CliArgs::parse_from([
        "vortex-dashboard",
        "--data-dir",
        dir.path().to_str().unwrap(),
        "--tester-url",
        "http://127.0.0.1:9",
    ]);
    let config = DashboardConfig::from_args(args);
    let db = DashboardDb::open(&config.data_dir).unwrap();
    let state = Arc::new(DashboardState::new(config, db));
    let router = build_router(state.clone());
    (dir, state, router)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Health ---

#[tokio::test]
async fn test_health_reports_idle() {
    let (_dir, _state, app) = make_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["session_state"], "idle");
    assert_eq!(json["account_count"], 0);
}

// --- Link intake ---

#[tokio::test]
async fn test_add_links_rejects_empty_input() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json("/links", serde_json::json!({"links": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_links_rejects_text_without_links() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json(
            "/links",
            serde_json::json!({"links": "nothing useful here"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_links_reports_partial_failure() {
    let (_dir, state, app) = make_app();
    let text = "vless://u@sg.example.com:443#SG\nvmess://bm90LWEtdXJs\n";
    let response = app
        .oneshot(post_json("/links", serde_json::json!({"links": text})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["new_accounts"], 1);
    assert_eq!(json["invalid_links"].as_array().unwrap().len(), 1);
    assert_eq!(json["total_accounts"], 1);
    assert_eq!(state.accounts.read().await.len(), 1);
}

// --- Session lifecycle ---

#[tokio::test]
async fn test_start_session_without_accounts_is_rejected() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json("/session/start", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_start_session_with_unreachable_tester_errors_the_session() {
    let (_dir, state, app) = make_app();
    app.clone()
        .oneshot(post_json(
            "/links",
            serde_json::json!({"links": "trojan://pw@jp.example.net:8443#JP"}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/session/start", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let coordinator = state.coordinator.read().await;
    assert_eq!(
        coordinator.state(),
        vortex_dashboard::session::SessionState::Errored
    );
}

#[tokio::test]
async fn test_results_idle_shape() {
    let (_dir, _state, app) = make_app();
    let response = app.oneshot(get("/session/results")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["state"], "idle");
    assert!(json["results"].as_array().unwrap().is_empty());
    assert_eq!(json["has_exportable_config"], false);
}

// --- Tester event ingestion ---

#[tokio::test]
async fn test_tester_event_outside_running_is_not_accepted() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json(
            "/tester/events",
            serde_json::json!({
                "type": "progress",
                "total": 1,
                "results": [{"index": 0, "Status": "Testing"}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["accepted"], false);
}

async fn start_running_session(state: &SharedState, n: usize) {
    let initial: Vec<AccountTestRecord> = (0..n)
        .map(|i| AccountTestRecord::waiting(i, &format!("node-{i}"), "vless"))
        .collect();
    let mut coordinator = state.coordinator.write().await;
    coordinator.submit(initial).unwrap();
}

#[tokio::test]
async fn test_tester_event_flow_through_completion_and_export() {
    let (_dir, state, app) = make_app();
    start_running_session(&state, 2).await;

    // Progress snapshot
    let response = app
        .clone()
        .oneshot(post_json(
            "/tester/events",
            serde_json::json!({
                "type": "progress",
                "total": 2,
                "results": [
                    {"index": 0, "Status": "●", "Latency": 42, "Country": "🇸🇬 SG", "Provider": "Acme", "Tested IP": "1.2.3.4", "VpnType": "vless"},
                    {"index": 1, "Status": "Testing"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["accepted"], true);

    // Terminal completion
    let response = app
        .clone()
        .oneshot(post_json(
            "/tester/events",
            serde_json::json!({
                "type": "completed",
                "total": 2,
                "successful": 1,
                "results": [
                    {"index": 0, "Status": "●", "Latency": 42, "Country": "🇸🇬 SG", "Provider": "Acme", "Tested IP": "1.2.3.4", "VpnType": "vless"},
                    {"index": 1, "Status": "✖timeout"}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["accepted"], true);

    // Completion materialized an export bundle and persisted the summary.
    assert!(state.export_config.read().await.is_some());
    let stored = state.db.latest_session().unwrap().unwrap();
    assert_eq!(stored.successful, 1);
    assert_eq!(stored.total, 2);

    // Download serves the bundle as an attachment.
    let response = app
        .clone()
        .oneshot(get("/export/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"VortexVpn-"));
    let bundle = body_json(response).await;
    assert_eq!(bundle["outbounds"].as_array().unwrap().len(), 1);
    assert_eq!(bundle["outbounds"][0]["tag"], "🇸🇬 SG Acme -1");

    // Results view reflects the completed session.
    let response = app.oneshot(get("/session/results")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["state"], "completed");
    assert_eq!(json["metrics"]["success_count"], 1);
    assert_eq!(json["has_exportable_config"], true);
}

#[tokio::test]
async fn test_completion_without_successes_keeps_export_gated() {
    let (_dir, state, app) = make_app();
    start_running_session(&state, 1).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/tester/events",
            serde_json::json!({
                "type": "completed",
                "total": 1,
                "successful": 0,
                "results": [{"index": 0, "Status": "✖dns"}]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(state.export_config.read().await.is_none());
    let response = app
        .clone()
        .oneshot(get("/export/download"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(post_json("/export/generate", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_generate_after_error_is_gated() {
    let (_dir, state, app) = make_app();
    start_running_session(&state, 1).await;
    app.clone()
        .oneshot(post_json(
            "/tester/events",
            serde_json::json!({
                "type": "error",
                "message": "probe pool exhausted"
            }),
        ))
        .await
        .unwrap();

    // Errored sessions never export, even with earlier partial successes.
    let response = app
        .oneshot(post_json("/export/generate", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(state.export_config.read().await.is_none());
}

// --- Store settings ---

#[tokio::test]
async fn test_store_config_requires_all_fields() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json(
            "/store/config",
            serde_json::json!({"owner": "acme", "repo": "links", "token": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_store_config_round_trip_persists_only_display_fields() {
    let (_dir, state, app) = make_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/store/config",
            serde_json::json!({"owner": "acme", "repo": "links", "token": "s3cret"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/store/config")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["configured"], true);
    assert_eq!(json["owner"], "acme");
    assert!(json.get("token").is_none());

    // Only owner/repo land in the database.
    assert_eq!(
        state.db.load_store_settings().unwrap(),
        Some(("acme".to_string(), "links".to_string()))
    );
    assert!(state.db.get_setting("token").unwrap().is_none());
    assert!(state.db.get_setting("store_token").unwrap().is_none());
}

#[tokio::test]
async fn test_load_hosted_without_store_config_is_rejected() {
    let (_dir, _state, app) = make_app();
    let response = app
        .oneshot(post_json(
            "/store/load",
            serde_json::json!({"path": "VortexVpn.json"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_publish_without_store_config_is_rejected() {
    let (_dir, state, app) = make_app();
    *state.export_config.write().await = Some("{}".to_string());
    let response = app
        .oneshot(post_json("/export/publish", serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
}

// --- Logs ---

#[tokio::test]
async fn test_log_history_collects_route_activity() {
    let (_dir, _state, app) = make_app();
    app.clone()
        .oneshot(post_json(
            "/links",
            serde_json::json!({"links": "vless://u@sg.example.com:443#SG"}),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/logs/history")).await.unwrap();
    let json = body_json(response).await;
    assert!(json["total"].as_u64().unwrap() >= 1);
    let entries = json["entries"].as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["message"].as_str().unwrap().contains("Added 1 account")));
}
