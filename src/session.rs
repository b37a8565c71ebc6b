use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::DashboardError;
use crate::export::{self, ExportArtifact, ExportSource};
use crate::metrics::{aggregate, SessionMetrics};
use crate::record::AccountTestRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Errored,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Errored)
    }
}

/// One run of testing over a fixed account set. Owned exclusively by the
/// coordinator; everything else sees immutable snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct TestSession {
    pub id: String,
    pub total: usize,
    pub records: Vec<AccountTestRecord>,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Terminal payload from the tester.
#[derive(Debug, Clone)]
pub struct CompletionSummary {
    pub total: usize,
    pub successful: usize,
    pub results: Vec<AccountTestRecord>,
}

/// Side-effect intents emitted by transitions. The coordinator decides what
/// happened; fan-out and materialization happen at the edges.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionIntent {
    Progress {
        session_id: String,
        metrics: SessionMetrics,
        results: Vec<AccountTestRecord>,
    },
    Completed {
        session_id: String,
        successful: usize,
        total: usize,
        metrics: SessionMetrics,
        results: Vec<AccountTestRecord>,
    },
    ExportAvailable {
        session_id: String,
        artifact: ExportArtifact,
    },
    Error {
        session_id: String,
        message: String,
    },
}

/// State machine for the testing session lifecycle:
/// Idle → Running → Completed | Errored. A new submission creates a fresh
/// session; a terminal session is kept around for display until then.
///
/// Snapshots are full replacements, and inbound delivery order is trusted:
/// the tester protocol carries no sequence number, so a later-arriving
/// snapshot always wins.
pub struct SessionCoordinator {
    session: Option<TestSession>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |s| s.state)
    }

    pub fn session(&self) -> Option<&TestSession> {
        self.session.as_ref()
    }

    /// Start a new session over `initial` pre-test records. Valid from Idle
    /// or a terminal state; a Running session is single-flight and rejects
    /// overlapping submissions.
    pub fn submit(
        &mut self,
        initial: Vec<AccountTestRecord>,
    ) -> Result<Vec<SessionIntent>, DashboardError> {
        if initial.is_empty() {
            return Err(DashboardError::Validation(
                "No accounts to test".to_string(),
            ));
        }
        if self.state() == SessionState::Running {
            return Err(DashboardError::Validation(
                "A test session is already running".to_string(),
            ));
        }

        let total = initial.len();
        let session = TestSession {
            id: Uuid::new_v4().to_string(),
            total,
            records: initial,
            state: SessionState::Running,
            started_at: Utc::now(),
            finished_at: None,
        };
        let intent = SessionIntent::Progress {
            session_id: session.id.clone(),
            metrics: aggregate(&session.records, total),
            results: session.records.clone(),
        };
        self.session = Some(session);
        Ok(vec![intent])
    }

    /// Apply a full-state progress snapshot. The incoming list replaces
    /// `records` wholesale; metrics are recomputed from scratch, so
    /// redelivery of an identical snapshot is harmless.
    pub fn on_snapshot(&mut self, results: Vec<AccountTestRecord>) -> Vec<SessionIntent> {
        let Some(session) = self.running_session("progress snapshot") else {
            return Vec::new();
        };
        session.records = results;
        let metrics = aggregate(&session.records, session.total);
        vec![SessionIntent::Progress {
            session_id: session.id.clone(),
            metrics,
            results: session.records.clone(),
        }]
    }

    /// Apply the terminal success event: finalize records, advance to
    /// Completed, and consult the export gate.
    pub fn on_completed(&mut self, summary: CompletionSummary) -> Vec<SessionIntent> {
        let Some(session) = self.running_session("completion event") else {
            return Vec::new();
        };
        if !summary.results.is_empty() {
            session.records = summary.results;
        }
        session.state = SessionState::Completed;
        session.finished_at = Some(Utc::now());

        let metrics = aggregate(&session.records, session.total);
        let mut intents = vec![SessionIntent::Completed {
            session_id: session.id.clone(),
            successful: summary.successful,
            total: summary.total,
            metrics: metrics.clone(),
            results: session.records.clone(),
        }];
        if let Some(artifact) =
            export::evaluate(&metrics, SessionState::Completed, ExportSource::Automatic)
        {
            intents.push(SessionIntent::ExportAvailable {
                session_id: session.id.clone(),
                artifact,
            });
        }
        intents
    }

    /// Apply the terminal error event. Records from the last snapshot stay
    /// visible, but no further transitions are accepted.
    pub fn on_error(&mut self, message: String) -> Vec<SessionIntent> {
        let Some(session) = self.running_session("error event") else {
            return Vec::new();
        };
        session.state = SessionState::Errored;
        session.finished_at = Some(Utc::now());
        vec![SessionIntent::Error {
            session_id: session.id.clone(),
            message,
        }]
    }

    /// Inbound events can race with UI-driven resets or be redelivered, so
    /// an event outside Running is logged and dropped, never fatal.
    fn running_session(&mut self, event: &str) -> Option<&mut TestSession> {
        match self.session.as_mut() {
            Some(s) if s.state == SessionState::Running => Some(s),
            Some(s) => {
                warn!(
                    session_id = %s.id,
                    state = ?s.state,
                    "Ignoring {} outside Running state",
                    event
                );
                None
            }
            None => {
                warn!("Ignoring {} with no active session", event);
                None
            }
        }
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
