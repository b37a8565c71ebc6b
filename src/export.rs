use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::metrics::SessionMetrics;
use crate::record::AccountTestRecord;
use crate::session::SessionState;
use crate::status::StatusKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSource {
    /// Generated by the completion path without user action.
    Automatic,
    /// Requested explicitly from the dashboard.
    Manual,
}

/// Descriptive metadata for one export. Immutable once created; a later
/// session supersedes it with a fresh artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub account_count: usize,
    pub generated_at: DateTime<Utc>,
    pub source: ExportSource,
}

/// Decide whether export actions become available. Only a Completed session
/// with at least one successful account qualifies; an Errored session keeps
/// its partial results visible but never exports them.
pub fn evaluate(
    metrics: &SessionMetrics,
    state: SessionState,
    source: ExportSource,
) -> Option<ExportArtifact> {
    if state != SessionState::Completed || metrics.success_count == 0 {
        return None;
    }
    Some(ExportArtifact {
        account_count: metrics.success_count,
        generated_at: Utc::now(),
        source,
    })
}

/// Display sort: preferred countries first, the rest alphabetically.
fn country_priority(country: &str) -> (u8, String) {
    const PREFERRED: &[(&str, u8)] = &[
        ("🇮🇩", 0),
        ("🇸🇬", 1),
        ("🇯🇵", 2),
        ("🇰🇷", 3),
        ("🇺🇸", 4),
    ];
    for (flag, rank) in PREFERRED {
        if country.contains(flag) {
            return (*rank, String::new());
        }
    }
    (5, country.to_string())
}

/// Strip parenthesized suffixes and commas from a provider display name.
pub fn clean_provider_name(provider: &str) -> String {
    let re = regex::Regex::new(r"\(.*?\)").unwrap();
    let cleaned = re.replace_all(provider, "");
    cleaned.replace(',', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Successful records in export order.
pub fn select_successful(records: &[AccountTestRecord]) -> Vec<AccountTestRecord> {
    let mut successful: Vec<AccountTestRecord> = records
        .iter()
        .filter(|r| r.kind() == StatusKind::Success)
        .cloned()
        .collect();
    successful.sort_by_key(|r| country_priority(&r.country));
    successful
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry {
    pub tag: String,
    pub vpn_type: String,
    pub tested_ip: String,
    pub latency_ms: i64,
}

/// Assemble the downloadable bundle: successful accounts sorted by country
/// priority and re-tagged `"{country} {provider} -{n}"`, 1-based.
pub fn materialize(records: &[AccountTestRecord]) -> String {
    let entries: Vec<ExportEntry> = select_successful(records)
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let provider = clean_provider_name(&r.provider);
            let tag = format!("{} {} -{}", r.country, provider, i + 1)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            ExportEntry {
                tag,
                vpn_type: r.vpn_type.clone(),
                tested_ip: r.tested_ip.clone(),
                latency_ms: r.latency_ms,
            }
        })
        .collect();

    serde_json::to_string_pretty(&serde_json::json!({ "outbounds": entries }))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Timestamped filename for downloads and default store paths.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("VortexVpn-{}.json", now.format("%Y%m%d-%H%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::aggregate;
    use crate::record::LATENCY_UNMEASURED;

    fn rec(index: usize, status: &str, country: &str, provider: &str) -> AccountTestRecord {
        let mut r = AccountTestRecord::waiting(index, "t", "vless");
        r.status = status.to_string();
        r.country = country.to_string();
        r.provider = provider.to_string();
        if status == "●" {
            r.latency_ms = 42;
        } else {
            r.latency_ms = LATENCY_UNMEASURED;
        }
        r
    }

    #[test]
    fn test_gate_requires_successes() {
        let records = vec![rec(0, "✖timeout", "🇺🇸 US", "A"), rec(1, "✖dns", "🇺🇸 US", "B")];
        let metrics = aggregate(&records, 2);
        assert!(evaluate(&metrics, SessionState::Completed, ExportSource::Automatic).is_none());
    }

    #[test]
    fn test_gate_produces_artifact_on_success() {
        let records = vec![
            rec(0, "●", "🇸🇬 SG", "A"),
            rec(1, "●", "🇯🇵 JP", "B"),
            rec(2, "●", "🇺🇸 US", "C"),
        ];
        let metrics = aggregate(&records, 3);
        let artifact = evaluate(&metrics, SessionState::Completed, ExportSource::Manual)
            .expect("artifact expected");
        assert_eq!(artifact.account_count, 3);
        assert_eq!(artifact.source, ExportSource::Manual);
    }

    #[test]
    fn test_gate_rejects_non_completed_states() {
        let records = vec![rec(0, "●", "🇸🇬 SG", "A")];
        let metrics = aggregate(&records, 1);
        for state in [SessionState::Idle, SessionState::Running, SessionState::Errored] {
            assert!(evaluate(&metrics, state, ExportSource::Automatic).is_none());
        }
    }

    #[test]
    fn test_country_priority_order() {
        let records = vec![
            rec(0, "●", "🇺🇸 United States", "A"),
            rec(1, "●", "🇩🇪 Germany", "B"),
            rec(2, "●", "🇮🇩 Indonesia", "C"),
            rec(3, "●", "🇦🇺 Australia", "D"),
        ];
        let ordered = select_successful(&records);
        let countries: Vec<&str> = ordered.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(
            countries,
            vec![
                "🇮🇩 Indonesia",
                "🇺🇸 United States",
                "🇦🇺 Australia",
                "🇩🇪 Germany"
            ]
        );
    }

    #[test]
    fn test_select_skips_non_success() {
        let records = vec![rec(0, "●", "🇸🇬 SG", "A"), rec(1, "Testing", "🇸🇬 SG", "B")];
        assert_eq!(select_successful(&records).len(), 1);
    }

    #[test]
    fn test_clean_provider_name() {
        assert_eq!(clean_provider_name("Acme (AS1234), Inc"), "Acme Inc");
        assert_eq!(clean_provider_name("  Plain  "), "Plain");
    }

    #[test]
    fn test_materialize_retags_one_based() {
        let records = vec![
            rec(0, "●", "🇸🇬 SG", "Beta (x)"),
            rec(1, "●", "🇮🇩 ID", "Alpha"),
        ];
        let bundle = materialize(&records);
        let parsed: serde_json::Value = serde_json::from_str(&bundle).unwrap();
        let outbounds = parsed["outbounds"].as_array().unwrap();
        assert_eq!(outbounds.len(), 2);
        // Indonesia sorts first and takes the -1 suffix.
        assert_eq!(outbounds[0]["tag"], "🇮🇩 ID Alpha -1");
        assert_eq!(outbounds[1]["tag"], "🇸🇬 SG Beta -2");
    }

    #[test]
    fn test_export_filename_format() {
        let ts = DateTime::parse_from_rfc3339("2025-03-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(export_filename(ts), "VortexVpn-20250301-0930.json");
    }
}
