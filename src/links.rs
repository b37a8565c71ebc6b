use percent_encoding::percent_decode_str;
use serde::Serialize;
use url::Url;

use crate::config::INVALID_LINK_DISPLAY_LEN;

const LINK_PATTERN: &str = r"(?:vless|vmess|trojan|ss)://[^\s]+";

/// One parsed connection link, kept in the working account set until a test
/// run is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAccount {
    pub vpn_type: String,
    pub server: String,
    pub port: u16,
    pub tag: String,
    /// Original link, needed when handing the account set to the tester.
    pub raw: String,
}

/// Outcome of one intake batch. Partial failure is not fatal: valid links
/// proceed, invalid ones are reported back for display.
#[derive(Debug, Default)]
pub struct LinkBatch {
    pub accounts: Vec<ParsedAccount>,
    pub invalid: Vec<String>,
}

/// Pull recognizable connection links out of free-form pasted text.
pub fn extract_links(text: &str) -> Vec<&str> {
    let re = regex::Regex::new(LINK_PATTERN).unwrap();
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Parse a single link. `None` for anything without a `credential@host`
/// authority (e.g. base64-payload vmess links, which the tester parses
/// itself but we cannot display meaningfully).
pub fn parse_link(link: &str) -> Option<ParsedAccount> {
    let url = Url::parse(link).ok()?;
    if url.username().is_empty() {
        return None;
    }
    let vpn_type = url.scheme().to_string();
    let server = url.host_str()?.to_string();
    let port = url.port().unwrap_or(443);
    let tag = url
        .fragment()
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{}-{}", vpn_type, server));

    Some(ParsedAccount {
        vpn_type,
        server,
        port,
        tag,
        raw: link.to_string(),
    })
}

/// Extract and parse every link found in `text`.
pub fn parse_batch(text: &str) -> LinkBatch {
    let mut batch = LinkBatch::default();
    for link in extract_links(text) {
        match parse_link(link) {
            Some(account) => batch.accounts.push(account),
            None => batch.invalid.push(truncate_for_display(link)),
        }
    }
    batch
}

/// Shorten an invalid link for the report shown to the user.
pub fn truncate_for_display(link: &str) -> String {
    if link.chars().count() > INVALID_LINK_DISPLAY_LEN {
        let prefix: String = link.chars().take(INVALID_LINK_DISPLAY_LEN).collect();
        format!("{}...", prefix)
    } else {
        link.to_string()
    }
}
