use serde::Serialize;

use crate::record::AccountTestRecord;
use crate::status::StatusKind;

/// Counters derived from a full record snapshot. Never stored — recomputed
/// from scratch on every snapshot, so reapplying the same snapshot is
/// idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionMetrics {
    pub total: usize,
    pub completed_count: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub in_progress_count: usize,
    /// Integer percent of completed over total, round-half-up. 0 when the
    /// session is empty.
    pub percentage: u32,
    /// Mean latency over successful records with a real measurement,
    /// rounded to the nearest millisecond. 0 when none qualify.
    pub avg_latency_ms: i64,
}

/// Fold a record snapshot into derived counters.
///
/// Waiting records are neither completed nor in-progress, so
/// `completed_count` is counted directly from terminal statuses rather than
/// as `total - in_progress_count`.
pub fn aggregate(records: &[AccountTestRecord], total: usize) -> SessionMetrics {
    let mut success_count = 0;
    let mut fail_count = 0;
    let mut in_progress_count = 0;
    let mut latency_sum: i64 = 0;
    let mut latency_n: i64 = 0;

    for record in records {
        match record.kind() {
            StatusKind::Success => {
                success_count += 1;
                if let Some(ms) = record.measured_latency() {
                    latency_sum += ms;
                    latency_n += 1;
                }
            }
            StatusKind::Failed => fail_count += 1,
            StatusKind::InProgress | StatusKind::Retrying => in_progress_count += 1,
            StatusKind::Waiting => {}
        }
    }

    let completed_count = success_count + fail_count;
    let percentage = if total == 0 {
        0
    } else {
        (completed_count as f64 / total as f64 * 100.0).round() as u32
    };
    let avg_latency_ms = if latency_n == 0 {
        0
    } else {
        (latency_sum as f64 / latency_n as f64).round() as i64
    };

    SessionMetrics {
        total,
        completed_count,
        success_count,
        fail_count,
        in_progress_count,
        percentage,
        avg_latency_ms,
    }
}
