pub mod error;
pub mod types;

pub use error::{OmdbError, Result};
pub use types::{TitleRecord, TitleResponse};

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";

/// Error strings OMDb returns (with HTTP 200) for ids it does not know.
const UNKNOWN_ID_ERRORS: &[&str] = &["incorrect imdb id", "movie not found", "error getting data"];

pub struct OmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.to_string(),
            api_key,
        }
    }

    /// Look up a title by its catalog id (e.g. `tt0133093`), requesting the
    /// full synopsis. Returns `Ok(None)` when the catalog has no such id.
    pub async fn title_by_id(&self, imdb_id: &str) -> Result<Option<TitleRecord>> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("i", imdb_id),
                ("plot", "full"),
                ("r", "json"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OmdbError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: TitleResponse = serde_json::from_str(&body)?;

        if !parsed.succeeded() {
            let message = parsed.error.unwrap_or_default();
            let lower = message.to_lowercase();
            if UNKNOWN_ID_ERRORS.iter().any(|e| lower.contains(e)) {
                tracing::debug!(imdb_id, message = %message, "omdb: unknown id");
                return Ok(None);
            }
            return Err(OmdbError::Rejected(message));
        }

        Ok(Some(TitleRecord::from_response(parsed, imdb_id)))
    }
}
