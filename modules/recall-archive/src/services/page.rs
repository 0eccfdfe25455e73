// Page renderers: fully rendered HTML via a local headless Chrome or a remote
// Browserless instance. One render, one browser session.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::BrowserlessClient;
use recall_common::{BrowserBackend, Config};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::{ResolveError, Result};
use crate::traits::PageRenderer;

/// Pick the renderer the configuration asks for.
pub fn renderer_from_config(config: &Config) -> Arc<dyn PageRenderer> {
    match &config.browser {
        BrowserBackend::Chrome { bin } => {
            Arc::new(ChromePageRenderer::new(bin, config.page_load_timeout))
        }
        BrowserBackend::Browserless { base_url, token } => Arc::new(BrowserlessPageRenderer::new(
            base_url,
            Some(token),
            config.page_load_timeout,
        )),
    }
}

pub struct ChromePageRenderer {
    bin: String,
    page_timeout: Duration,
}

impl ChromePageRenderer {
    pub fn new(bin: &str, page_timeout: Duration) -> Self {
        info!(bin, timeout_ms = page_timeout.as_millis() as u64, "ChromePageRenderer initialized");
        Self {
            bin: bin.to_string(),
            page_timeout,
        }
    }
}

#[async_trait]
impl PageRenderer for ChromePageRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        check_scheme(url)?;
        info!(url, "page: rendering via chrome");

        let session = BrowserSession::launch(&self.bin, url)?;
        let dom = session.dump_dom(url, self.page_timeout).await?;
        if dom.is_empty() {
            warn!(url, "page: empty DOM output");
            return Err(ResolveError::Transient(format!("Chrome returned empty DOM for {url}")));
        }

        info!(url, bytes = dom.len(), "page: rendered");
        Ok(String::from_utf8_lossy(&dom).into_owned())
    }
}

/// A headless browser process plus its throwaway profile directory.
///
/// Dropping the session kills the process and deletes the profile, so every
/// exit path of a render tears the browser down, timeouts included.
struct BrowserSession {
    child: Child,
    _profile: tempfile::TempDir,
}

impl BrowserSession {
    fn launch(bin: &str, url: &str) -> Result<Self> {
        let profile = tempfile::tempdir().map_err(|e| ResolveError::storage(&std::env::temp_dir(), e))?;
        let child = Command::new(bin)
            .args([
                "--headless",
                "--no-sandbox",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                &format!("--user-data-dir={}", profile.path().display()),
                "--dump-dom",
                url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolveError::Transient(format!("Failed to launch {bin}: {e}")))?;

        Ok(Self {
            child,
            _profile: profile,
        })
    }

    async fn dump_dom(self, url: &str, page_timeout: Duration) -> Result<Vec<u8>> {
        let BrowserSession { child, _profile } = self;
        let output = tokio::time::timeout(page_timeout, child.wait_with_output())
            .await
            .map_err(|_| ResolveError::Timeout {
                url: url.to_string(),
                timeout_ms: page_timeout.as_millis() as u64,
            })?
            .map_err(|e| ResolveError::Transient(format!("Chrome failed for {url}: {e}")))?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(url, stderr = %stderr, "Chrome exited with error");
        if is_transient_error(&stderr) {
            return Err(ResolveError::Transient(format!("Chrome could not start: {stderr}")));
        }
        Err(ResolveError::NotFound(format!(
            "Chrome exited with {} for {url}",
            output.status
        )))
    }
}

pub struct BrowserlessPageRenderer {
    client: BrowserlessClient,
    page_timeout: Duration,
}

impl BrowserlessPageRenderer {
    pub fn new(base_url: &str, token: Option<&str>, page_timeout: Duration) -> Self {
        info!(base_url, "BrowserlessPageRenderer initialized");
        Self {
            client: BrowserlessClient::new(base_url, token),
            page_timeout,
        }
    }
}

#[async_trait]
impl PageRenderer for BrowserlessPageRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        check_scheme(url)?;
        info!(url, "page: rendering via browserless");

        let html = self.client.content(url, self.page_timeout).await?;
        if html.is_empty() {
            warn!(url, "page: empty HTML response");
            return Err(ResolveError::Transient(format!("Browserless returned no HTML for {url}")));
        }

        info!(url, bytes = html.len(), "page: rendered");
        Ok(html)
    }
}

fn check_scheme(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| ResolveError::NotFound(format!("Invalid URL {url}: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ResolveError::NotFound(format!(
            "Only http/https URLs allowed, got: {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn is_transient_error(msg: &str) -> bool {
    msg.contains("Cannot fork") || msg.contains("Resource temporarily unavailable")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_urls_are_rejected() {
        assert!(check_scheme("https://www.goodreads.com/book/show/1").is_ok());
        assert!(check_scheme("file:///etc/passwd").is_err());
        assert!(check_scheme("not a url").is_err());
    }

    #[tokio::test]
    async fn missing_browser_binary_is_transient() {
        let renderer = ChromePageRenderer::new("/nonexistent/chromium-binary", Duration::from_secs(1));
        let err = renderer.render("https://example.com/").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_browser_times_out_with_its_own_reason() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-browser");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let renderer = ChromePageRenderer::new(script.to_str().unwrap(), Duration::from_millis(100));
        let err = renderer.render("https://example.com/").await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout { timeout_ms: 100, .. }));
    }
}
