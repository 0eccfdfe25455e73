// Trait seams for the external services behind the resolvers.
//
// MovieCatalog: primary movie catalog lookups (OmdbClient)
// KnowledgeGraph: encyclopedia + knowledge-graph lookups (WikimediaClient)
// PageRenderer: rendered HTML for secondary-catalog pages (Chrome, Browserless)
//
// The resolvers own caching and retry; implementations make exactly one
// external call per method call. `testing` provides counting mocks.

use async_trait::async_trait;
use omdb_client::{OmdbClient, TitleRecord};
use recall_common::CatalogId;
use wikimedia_client::{Entity, PageMatch, PageText, SearchHit, WikimediaClient};

use crate::error::Result;

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// `None` when the catalog does not know the id.
    async fn title(&self, id: &CatalogId) -> Result<Option<TitleRecord>>;
}

#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Page title → entity ids via page properties. `None` when no page matches.
    async fn entity_ids_for_title(&self, title: &str) -> Result<Option<Vec<PageMatch>>>;

    async fn opensearch(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>>;

    async fn page_text(&self, title: &str) -> Result<PageText>;

    /// `None` for ids the knowledge graph reports missing.
    async fn entity(&self, entity_id: &str, language: &str) -> Result<Option<Entity>>;
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Fully rendered HTML for `url`.
    async fn render(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl MovieCatalog for OmdbClient {
    async fn title(&self, id: &CatalogId) -> Result<Option<TitleRecord>> {
        Ok(self.title_by_id(id.as_str()).await?)
    }
}

#[async_trait]
impl KnowledgeGraph for WikimediaClient {
    async fn entity_ids_for_title(&self, title: &str) -> Result<Option<Vec<PageMatch>>> {
        Ok(WikimediaClient::entity_ids_for_title(self, title).await?)
    }

    async fn opensearch(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        Ok(WikimediaClient::opensearch(self, query, limit).await?)
    }

    async fn page_text(&self, title: &str) -> Result<PageText> {
        Ok(WikimediaClient::page_text(self, title).await?)
    }

    async fn entity(&self, entity_id: &str, language: &str) -> Result<Option<Entity>> {
        Ok(WikimediaClient::entity(self, entity_id, language).await?)
    }
}
