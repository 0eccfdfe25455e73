pub mod error;
pub mod types;

pub use error::{Result, WikimediaError};
pub use types::{
    DataValue, Entity, LanguageValue, PageExtract, PageMatch, PageText, SearchHit, Sitelink, Snak,
    Statement,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use types::{EntitiesResponse, QueryResponse};

pub const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
pub const WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";

/// Wikimedia rejects anonymous clients without a descriptive agent.
const USER_AGENT: &str = concat!("recall/", env!("CARGO_PKG_VERSION"), " (dataset builder)");

pub struct WikimediaClient {
    client: reqwest::Client,
    wikipedia_api: String,
    wikidata_api: String,
}

impl WikimediaClient {
    pub fn new(wikipedia_api: &str, wikidata_api: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            wikipedia_api: wikipedia_api.to_string(),
            wikidata_api: wikidata_api.to_string(),
        }
    }

    /// Resolve a page title (following redirects) to the knowledge-graph
    /// entities its page properties point at.
    ///
    /// Returns `None` when the API reports no pages at all, and an empty list
    /// when pages exist but none carries an entity id.
    pub async fn entity_ids_for_title(&self, title: &str) -> Result<Option<Vec<PageMatch>>> {
        let resp: QueryResponse = self
            .get(
                &self.wikipedia_api,
                &[
                    ("action", "query"),
                    ("prop", "pageprops"),
                    ("ppprop", "wikibase_item"),
                    ("redirects", "1"),
                    ("titles", title),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .await?;

        let Some(query) = resp.query else {
            return Ok(None);
        };
        if query.pages.is_empty() {
            return Ok(None);
        }

        let matches = query
            .pages
            .into_iter()
            .filter_map(|page| {
                let entity_id = page
                    .pageprops?
                    .get("wikibase_item")?
                    .as_str()?
                    .to_string();
                Some(PageMatch {
                    title: page.title,
                    entity_id,
                })
            })
            .collect();

        Ok(Some(matches))
    }

    /// Title prefix search over article space.
    pub async fn opensearch(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        let limit = limit.to_string();
        let resp: (String, Vec<String>, Vec<String>, Vec<String>) = self
            .get(
                &self.wikipedia_api,
                &[
                    ("action", "opensearch"),
                    ("search", query),
                    ("limit", limit.as_str()),
                    ("namespace", "0"),
                    ("format", "json"),
                ],
            )
            .await?;

        let (_, titles, _, urls) = resp;
        Ok(titles
            .into_iter()
            .zip(urls)
            .map(|(title, url)| SearchHit { title, url })
            .collect())
    }

    /// Fetch the plain-text body of a page.
    pub async fn page_text(&self, title: &str) -> Result<PageText> {
        let resp: QueryResponse = self
            .get(
                &self.wikipedia_api,
                &[
                    ("action", "query"),
                    ("prop", "extracts|pageprops"),
                    ("explaintext", "1"),
                    ("exsectionformat", "wiki"),
                    ("redirects", "1"),
                    ("titles", title),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .await?;

        let Some(page) = resp.query.and_then(|q| q.pages.into_iter().next()) else {
            return Ok(PageText::Missing);
        };
        if page.missing || page.invalid {
            return Ok(PageText::Missing);
        }
        let disambiguation = page
            .pageprops
            .as_ref()
            .is_some_and(|p| p.contains_key("disambiguation"));
        if disambiguation {
            return Ok(PageText::Disambiguation);
        }

        Ok(PageText::Found(PageExtract {
            page_id: page.pageid.unwrap_or_default(),
            title: page.title,
            text: page.extract,
        }))
    }

    /// Fetch one entity with labels, claims and site-link URLs.
    /// Returns `None` for ids the knowledge graph reports as missing.
    pub async fn entity(&self, entity_id: &str, language: &str) -> Result<Option<Entity>> {
        let resp: EntitiesResponse = self
            .get(
                &self.wikidata_api,
                &[
                    ("action", "wbgetentities"),
                    ("ids", entity_id),
                    ("props", "info|labels|claims|sitelinks/urls"),
                    ("languages", language),
                    ("format", "json"),
                ],
            )
            .await?;

        let Some(raw) = resp.entities.into_values().next() else {
            return Ok(None);
        };
        if raw.get("missing").is_some() {
            tracing::debug!(entity_id, "wikidata: entity missing");
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(raw)?))
    }

    async fn get<T: DeserializeOwned>(&self, api: &str, params: &[(&str, &str)]) -> Result<T> {
        let resp = self.client.get(api).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WikimediaError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
