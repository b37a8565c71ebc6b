use serde::Serialize;

/// Pre-test sentinel emitted by the tester before an account is scheduled.
pub const WAITING_TOKEN: &str = "WAIT";

/// Terminal-success glyphs. The tester has emitted both forms across revisions.
pub const SUCCESS_TOKENS: &[&str] = &["●", "✅"];

/// Terminal-failure prefixes; the remainder is a free-text reason.
pub const FAILURE_PREFIXES: &[&str] = &["✖", "❌"];

const IN_PROGRESS_PREFIXES: &[&str] = &["Testing", "🔄"];
const RETRY_PREFIXES: &[&str] = &["Retry", "🔁"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Waiting,
    InProgress,
    Retrying,
    Success,
    Failed,
}

impl StatusKind {
    /// Terminal statuses count toward `completed`; Waiting and both
    /// in-flight kinds do not.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusKind::Success | StatusKind::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, StatusKind::InProgress | StatusKind::Retrying)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub kind: StatusKind,
    /// Failure reason or retry attempt info, when the raw token carried one.
    pub detail: Option<String>,
}

impl Status {
    fn plain(kind: StatusKind) -> Self {
        Self { kind, detail: None }
    }

    fn with_detail(kind: StatusKind, remainder: &str) -> Self {
        let remainder = remainder.trim();
        Self {
            kind,
            detail: (!remainder.is_empty()).then(|| remainder.to_string()),
        }
    }
}

/// Map a raw tester status token into the closed taxonomy.
///
/// Total over arbitrary strings: the tester's status column is free text, so
/// anything unrecognized degrades to Waiting rather than erroring. Exact
/// sentinels are checked before the prefix rules.
pub fn classify(raw: &str) -> Status {
    if raw == WAITING_TOKEN {
        return Status::plain(StatusKind::Waiting);
    }
    if SUCCESS_TOKENS.contains(&raw) {
        return Status::plain(StatusKind::Success);
    }
    for prefix in FAILURE_PREFIXES {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return Status::with_detail(StatusKind::Failed, rest);
        }
    }
    for prefix in IN_PROGRESS_PREFIXES {
        if raw.starts_with(prefix) {
            return Status::plain(StatusKind::InProgress);
        }
    }
    for prefix in RETRY_PREFIXES {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return Status::with_detail(StatusKind::Retrying, rest);
        }
    }
    Status::plain(StatusKind::Waiting)
}
