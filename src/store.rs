use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::config::STORE_CALL_TIMEOUT_SECS;
use crate::error::DashboardError;

/// Remote link-hosting store coordinates. Only `owner`/`repo` are ever
/// persisted; the token lives in memory for the process lifetime.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl StoreConfig {
    fn contents_url(&self, path: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/contents/{}",
            self.owner, self.repo, path
        )
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct StoreFailure {
    message: String,
}

async fn upstream_failure(resp: reqwest::Response) -> DashboardError {
    let status = resp.status();
    match resp.json::<StoreFailure>().await {
        Ok(failure) => DashboardError::Upstream(failure.message),
        Err(_) => DashboardError::Upstream(format!("store request failed ({})", status)),
    }
}

/// Fetch a hosted file; returns decoded content and the blob sha needed to
/// update it later.
pub async fn fetch_file(
    client: &reqwest::Client,
    cfg: &StoreConfig,
    path: &str,
) -> Result<(String, String), DashboardError> {
    let resp = client
        .get(cfg.contents_url(path))
        .bearer_auth(&cfg.token)
        .header("User-Agent", "vortex-dashboard")
        .send()
        .await
        .map_err(|e| DashboardError::Transport(format!("store unreachable: {}", e)))?;

    if !resp.status().is_success() {
        return Err(upstream_failure(resp).await);
    }

    let contents: ContentsResponse = resp
        .json()
        .await
        .map_err(|e| DashboardError::Upstream(format!("bad store response: {}", e)))?;

    // The contents API wraps base64 at 60 columns.
    let raw: String = contents.content.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = BASE64
        .decode(raw)
        .map_err(|e| DashboardError::Upstream(format!("undecodable store content: {}", e)))?;
    let content = String::from_utf8(decoded)
        .map_err(|e| DashboardError::Upstream(format!("non-UTF8 store content: {}", e)))?;

    Ok((content, contents.sha))
}

/// Create or update a hosted file with the user-supplied commit message.
/// `sha` must be the current blob sha when updating an existing path.
pub async fn publish(
    client: &reqwest::Client,
    cfg: &StoreConfig,
    path: &str,
    content: &str,
    message: &str,
    sha: Option<&str>,
) -> Result<(), DashboardError> {
    let mut body = serde_json::json!({
        "message": message,
        "content": BASE64.encode(content),
    });
    if let Some(sha) = sha {
        body["sha"] = serde_json::Value::String(sha.to_string());
    }

    let resp = client
        .put(cfg.contents_url(path))
        .bearer_auth(&cfg.token)
        .header("User-Agent", "vortex-dashboard")
        // Uploads can outlast the client-wide timeout.
        .timeout(Duration::from_secs(STORE_CALL_TIMEOUT_SECS))
        .json(&body)
        .send()
        .await
        .map_err(|e| DashboardError::Transport(format!("store unreachable: {}", e)))?;

    if !resp.status().is_success() {
        return Err(upstream_failure(resp).await);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_url() {
        let cfg = StoreConfig {
            owner: "acme".into(),
            repo: "links".into(),
            token: "t".into(),
        };
        assert_eq!(
            cfg.contents_url("VortexVpn-20250301-0930.json"),
            "https://api.github.com/repos/acme/links/contents/VortexVpn-20250301-0930.json"
        );
    }
}
