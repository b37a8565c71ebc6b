use serde::{Deserialize, Serialize};

use crate::status::{classify, StatusKind, WAITING_TOKEN};

/// "Not measured" sentinel for latency/jitter fields.
pub const LATENCY_UNMEASURED: i64 = -1;

/// One tested VPN account, as the tester reports it. Field names follow the
/// tester's wire format. Records are replaced wholesale on each snapshot,
/// never merged field-by-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTestRecord {
    pub index: usize,
    #[serde(rename = "VpnType", default)]
    pub vpn_type: String,
    #[serde(rename = "OriginalTag", default)]
    pub tag: String,
    #[serde(rename = "Country", default = "unknown_country")]
    pub country: String,
    #[serde(rename = "Provider", default = "dash")]
    pub provider: String,
    #[serde(rename = "Tested IP", default = "dash")]
    pub tested_ip: String,
    #[serde(rename = "Latency", default = "unmeasured")]
    pub latency_ms: i64,
    #[serde(rename = "Jitter", default = "unmeasured")]
    pub jitter_ms: i64,
    #[serde(rename = "ICMP", default = "not_applicable")]
    pub icmp: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "TestType", default = "not_applicable")]
    pub test_type: String,
    #[serde(rename = "Retry", default)]
    pub retry: u32,
}

fn unknown_country() -> String {
    "❓".to_string()
}

fn dash() -> String {
    "-".to_string()
}

fn not_applicable() -> String {
    "N/A".to_string()
}

fn unmeasured() -> i64 {
    LATENCY_UNMEASURED
}

impl AccountTestRecord {
    /// Pre-test placeholder row shown before the first snapshot arrives.
    pub fn waiting(index: usize, tag: &str, vpn_type: &str) -> Self {
        Self {
            index,
            vpn_type: vpn_type.to_string(),
            tag: tag.to_string(),
            country: unknown_country(),
            provider: dash(),
            tested_ip: dash(),
            latency_ms: LATENCY_UNMEASURED,
            jitter_ms: LATENCY_UNMEASURED,
            icmp: not_applicable(),
            status: WAITING_TOKEN.to_string(),
            test_type: not_applicable(),
            retry: 0,
        }
    }

    pub fn kind(&self) -> StatusKind {
        classify(&self.status).kind
    }

    /// A measured latency exists only for successful records without the
    /// `-1` sentinel.
    pub fn measured_latency(&self) -> Option<i64> {
        (self.kind() == StatusKind::Success && self.latency_ms != LATENCY_UNMEASURED)
            .then_some(self.latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_waiting_record_defaults() {
        let rec = AccountTestRecord::waiting(3, "my-node", "vless");
        assert_eq!(rec.index, 3);
        assert_eq!(rec.status, "WAIT");
        assert_eq!(rec.kind(), StatusKind::Waiting);
        assert_eq!(rec.latency_ms, LATENCY_UNMEASURED);
        assert_eq!(rec.jitter_ms, LATENCY_UNMEASURED);
        assert!(rec.measured_latency().is_none());
    }

    #[test]
    fn test_deserializes_tester_wire_format() {
        let rec: AccountTestRecord = serde_json::from_value(json!({
            "index": 0,
            "VpnType": "trojan",
            "OriginalTag": "🇸🇬 Acme -1",
            "Country": "🇸🇬 Singapore",
            "Provider": "Acme Ltd",
            "Tested IP": "1.2.3.4",
            "Latency": 82,
            "Jitter": 4,
            "ICMP": "✔",
            "Status": "●",
            "TestType": "SNI TCP",
            "Retry": 1
        }))
        .unwrap();
        assert_eq!(rec.kind(), StatusKind::Success);
        assert_eq!(rec.measured_latency(), Some(82));
        assert_eq!(rec.tested_ip, "1.2.3.4");
    }

    #[test]
    fn test_missing_optional_fields_take_placeholders() {
        let rec: AccountTestRecord = serde_json::from_value(json!({
            "index": 2,
            "Status": "WAIT"
        }))
        .unwrap();
        assert_eq!(rec.country, "❓");
        assert_eq!(rec.provider, "-");
        assert_eq!(rec.latency_ms, LATENCY_UNMEASURED);
        assert_eq!(rec.retry, 0);
    }

    #[test]
    fn test_sentinel_latency_is_not_measured() {
        let mut rec = AccountTestRecord::waiting(0, "x", "vless");
        rec.status = "●".to_string();
        assert!(rec.measured_latency().is_none());
        rec.latency_ms = 120;
        assert_eq!(rec.measured_latency(), Some(120));
    }

    #[test]
    fn test_failed_record_latency_is_not_measured() {
        let mut rec = AccountTestRecord::waiting(0, "x", "vless");
        rec.status = "✖timeout".to_string();
        rec.latency_ms = 50;
        assert!(rec.measured_latency().is_none());
    }
}
