pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;

/// Slack on top of the page-load budget for the HTTP round trip itself.
const REQUEST_OVERHEAD: Duration = Duration::from_secs(5);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions {
    timeout: u64,
    wait_until: &'static str,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch fully-rendered HTML for a URL via the /content endpoint.
    ///
    /// `page_timeout` bounds the browser-side navigation. A navigation that
    /// exceeds it (reported by Browserless as a 408, or observed locally as a
    /// request timeout) comes back as [`BrowserlessError::Timeout`].
    pub async fn content(&self, url: &str, page_timeout: Duration) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let timeout_ms = page_timeout.as_millis() as u64;
        let body = ContentRequest {
            url,
            goto_options: GotoOptions {
                timeout: timeout_ms,
                wait_until: "domcontentloaded",
            },
        };

        let resp = self
            .client
            .post(&endpoint)
            .timeout(page_timeout + REQUEST_OVERHEAD)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout {
                        url: url.to_string(),
                        timeout_ms,
                    }
                } else {
                    BrowserlessError::from(e)
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 408 {
            return Err(BrowserlessError::Timeout {
                url: url.to_string(),
                timeout_ms,
            });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::debug!(url, status = status.as_u16(), "browserless: content request rejected");
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
