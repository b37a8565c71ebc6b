use serde::{Deserialize, Serialize};

use crate::error::DashboardError;
use crate::links::ParsedAccount;
use crate::record::AccountTestRecord;

/// Inbound streaming events the tester delivers to `/tester/events`.
/// `progress` arrives zero or more times as a full snapshot; exactly one of
/// `completed`/`error` terminates the session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TesterEvent {
    Progress {
        total: usize,
        results: Vec<AccountTestRecord>,
    },
    Completed {
        total: usize,
        successful: usize,
        results: Vec<AccountTestRecord>,
    },
    Error {
        message: String,
    },
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    account_count: usize,
    accounts: &'a [ParsedAccount],
    callback_path: &'a str,
}

#[derive(Deserialize)]
struct UpstreamFailure {
    message: String,
}

/// Fire-and-forget handoff: ask the tester to begin testing the given
/// account set. The tester pushes progress back on the callback endpoint;
/// this call only confirms the run was accepted.
pub async fn submit_test_run(
    client: &reqwest::Client,
    base_url: &str,
    accounts: &[ParsedAccount],
) -> Result<(), DashboardError> {
    let url = format!("{}/runs", base_url);
    let body = SubmitRequest {
        account_count: accounts.len(),
        accounts,
        callback_path: "/tester/events",
    };

    let resp = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| DashboardError::Transport(format!("tester unreachable: {}", e)))?;

    if resp.status().is_success() {
        return Ok(());
    }

    let status = resp.status();
    match resp.json::<UpstreamFailure>().await {
        Ok(failure) => Err(DashboardError::Upstream(failure.message)),
        Err(_) => Err(DashboardError::Upstream(format!(
            "tester rejected run ({})",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_event_deserializes() {
        let event: TesterEvent = serde_json::from_value(json!({
            "type": "progress",
            "total": 2,
            "results": [
                {"index": 0, "Status": "Testing"},
                {"index": 1, "Status": "WAIT"}
            ]
        }))
        .unwrap();
        match event {
            TesterEvent::Progress { total, results } => {
                assert_eq!(total, 2);
                assert_eq!(results.len(), 2);
            }
            other => panic!("expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_completed_event_deserializes() {
        let event: TesterEvent = serde_json::from_value(json!({
            "type": "completed",
            "total": 1,
            "successful": 1,
            "results": [{"index": 0, "Status": "●", "Latency": 12}]
        }))
        .unwrap();
        assert!(matches!(event, TesterEvent::Completed { successful: 1, .. }));
    }

    #[test]
    fn test_error_event_deserializes() {
        let event: TesterEvent = serde_json::from_value(json!({
            "type": "error",
            "message": "probe pool exhausted"
        }))
        .unwrap();
        match event {
            TesterEvent::Error { message } => assert_eq!(message, "probe pool exhausted"),
            other => panic!("expected error, got {:?}", other),
        }
    }
}
