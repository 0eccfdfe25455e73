// Test mocks for the resolvers.
//
// Three mocks matching the three trait boundaries:
// - MockCatalog (MovieCatalog): id→TitleRecord, unknown ids answer `None`
// - MockKnowledgeGraph (KnowledgeGraph): titles, searches, pages and entities
// - MockRenderer (PageRenderer): URL→HTML, unknown URLs are `NotFound`
//
// Every mock counts its calls so tests can assert that a cached rerun makes no
// external calls at all.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use omdb_client::TitleRecord;
use recall_common::CatalogId;
use serde_json::json;
use wikimedia_client::{
    DataValue, Entity, LanguageValue, PageExtract, PageMatch, PageText, SearchHit, Snak, Statement,
};

use crate::error::{ResolveError, Result};
use crate::traits::{KnowledgeGraph, MovieCatalog, PageRenderer};

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

/// Builder pattern: `.on_title()`, `.on_title_as()`, `.failing_transiently()`.
pub struct MockCatalog {
    titles: HashMap<CatalogId, TitleRecord>,
    transient_failures: AtomicU32,
    calls: AtomicU32,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            titles: HashMap::new(),
            transient_failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Register a record under the id it reports.
    pub fn on_title(self, record: TitleRecord) -> Self {
        let id = record.imdb_id.clone();
        self.on_title_as(&id, record)
    }

    /// Register a record under a different requested id (a merged title).
    pub fn on_title_as(mut self, requested: &str, record: TitleRecord) -> Self {
        let id = CatalogId::parse(requested).expect("mock catalog id");
        self.titles.insert(id, record);
        self
    }

    /// The next `n` calls fail with a transient error.
    pub fn failing_transiently(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovieCatalog for MockCatalog {
    async fn title(&self, id: &CatalogId) -> Result<Option<TitleRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        take_transient(&self.transient_failures)?;
        Ok(self.titles.get(id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockKnowledgeGraph
// ---------------------------------------------------------------------------

/// Builder pattern: `.on_title()`, `.on_opensearch()`, `.on_page()`,
/// `.on_disambiguation()`, `.on_entity()`. Unregistered lookups answer the
/// way the live service does for unknown input: no match, no hits, missing
/// page, missing entity.
pub struct MockKnowledgeGraph {
    titles: HashMap<String, Vec<PageMatch>>,
    searches: HashMap<String, Vec<SearchHit>>,
    pages: HashMap<String, PageText>,
    entities: HashMap<String, Entity>,
    transient_failures: AtomicU32,
    calls: AtomicU32,
    entity_calls: AtomicU32,
}

impl MockKnowledgeGraph {
    pub fn new() -> Self {
        Self {
            titles: HashMap::new(),
            searches: HashMap::new(),
            pages: HashMap::new(),
            entities: HashMap::new(),
            transient_failures: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            entity_calls: AtomicU32::new(0),
        }
    }

    /// `matches` are `(normalized title, entity id)` pairs.
    pub fn on_title(mut self, title: &str, matches: &[(&str, &str)]) -> Self {
        let matches = matches
            .iter()
            .map(|(title, entity_id)| PageMatch {
                title: title.to_string(),
                entity_id: entity_id.to_string(),
            })
            .collect();
        self.titles.insert(title.to_string(), matches);
        self
    }

    /// `hits` are `(title, url)` pairs.
    pub fn on_opensearch(mut self, query: &str, hits: &[(&str, &str)]) -> Self {
        let hits = hits
            .iter()
            .map(|(title, url)| SearchHit {
                title: title.to_string(),
                url: url.to_string(),
            })
            .collect();
        self.searches.insert(query.to_string(), hits);
        self
    }

    pub fn on_page(mut self, title: &str, text: &str) -> Self {
        let page = PageExtract {
            page_id: self.pages.len() as u64 + 1,
            title: title.to_string(),
            text: Some(text.to_string()),
        };
        self.pages.insert(title.to_string(), PageText::Found(page));
        self
    }

    pub fn on_disambiguation(mut self, title: &str) -> Self {
        self.pages.insert(title.to_string(), PageText::Disambiguation);
        self
    }

    pub fn on_entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn failing_transiently(self, n: u32) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Calls across every method.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn entity_calls(&self) -> u32 {
        self.entity_calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        take_transient(&self.transient_failures)
    }
}

impl Default for MockKnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeGraph for MockKnowledgeGraph {
    async fn entity_ids_for_title(&self, title: &str) -> Result<Option<Vec<PageMatch>>> {
        self.record_call()?;
        Ok(self.titles.get(title).cloned())
    }

    async fn opensearch(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        self.record_call()?;
        let mut hits = self.searches.get(query).cloned().unwrap_or_default();
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn page_text(&self, title: &str) -> Result<PageText> {
        self.record_call()?;
        Ok(self.pages.get(title).cloned().unwrap_or(PageText::Missing))
    }

    async fn entity(&self, entity_id: &str, _language: &str) -> Result<Option<Entity>> {
        self.record_call()?;
        self.entity_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.get(entity_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

pub struct MockRenderer {
    pages: HashMap<String, String>,
    calls: AtomicU32,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(format!("MockRenderer: no page registered for {url}")))
    }
}

fn take_transient(remaining: &AtomicU32) -> Result<()> {
    let failing = remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return Err(ResolveError::Transient("mock: connection reset".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn title_record(imdb_id: &str, title: &str, plots: &[&str]) -> TitleRecord {
    TitleRecord {
        imdb_id: imdb_id.to_string(),
        title: Some(title.to_string()),
        year: None,
        kind: Some("movie".to_string()),
        plots: plots.iter().map(|p| p.to_string()).collect(),
    }
}

/// A bare entity with an English label.
pub fn entity(id: &str, label: &str) -> Entity {
    let mut entity = Entity {
        id: id.to_string(),
        labels: Default::default(),
        claims: Default::default(),
        sitelinks: Default::default(),
    };
    entity.labels.insert(
        "en".to_string(),
        LanguageValue {
            language: "en".to_string(),
            value: label.to_string(),
        },
    );
    entity
}

/// An entity whose claims hold plain string values, one statement per value.
pub fn entity_with_claims(id: &str, claims: &[(&str, &[&str])]) -> Entity {
    let mut entity = entity(id, id);
    for (property, values) in claims {
        let statements = values
            .iter()
            .map(|value| Statement {
                mainsnak: Snak {
                    snaktype: "value".to_string(),
                    property: property.to_string(),
                    datavalue: Some(DataValue {
                        value: json!(value),
                        kind: "string".to_string(),
                    }),
                },
                rank: Some("normal".to_string()),
            })
            .collect();
        entity.claims.insert(property.to_string(), statements);
    }
    entity
}
