use shopsight_core::{Error, Result};
use std::time::Duration;
use tracing::warn;

/// Browser-like identity; some storefronts reject obvious bot agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-request timeout. The run itself carries no overall deadline;
/// that is the calling boundary's concern.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Thin wrapper over a pooled `reqwest::Client`, shared by every
/// extraction stage within one run. Connections are reused across
/// calls and released when the wrapper is dropped at run end.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    /// GET returning the body as text. Transport failures and non-2xx
    /// statuses come back typed so callers can apply their own
    /// skip-and-continue policy.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Skip-and-continue fetch: any failure degrades to `None` with a
    /// warning, so heuristic stages proceed with partial data.
    pub async fn page(&self, url: &str) -> Option<String> {
        match self.get_text(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "page fetch degraded to absent");
                None
            }
        }
    }
}
