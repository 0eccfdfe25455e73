// Resolution orchestrators: one mention in, every candidate its links point at
// out. Movies go through the primary catalog and the knowledge graph; books
// through the secondary catalog scraper and the knowledge graph.
//
// Anticipated failures (NotFound, Ambiguous) become unconfident results.
// Anything else propagates so the driver can skip the whole thread.

use std::collections::BTreeMap;
use std::iter;

use async_trait::async_trait;
use recall_archive::links;
use recall_archive::{
    BookshelfScraper, CatalogRecord, CatalogResolver, KnowledgeGraphResolver, ResolveError,
    Result, WikiPlots, WorkIndex, PLOT_SECTIONS,
};
use recall_common::{
    BookCandidate, CandidateEntity, CatalogId, MovieCandidate, RawMention, ResolutionResult,
    Source,
};
use tracing::debug;
use wikimedia_client::{Entity, PageMatch};

/// Host token of the primary movie catalog.
pub const CATALOG_HOST: &str = "imdb";
/// Host token of the encyclopedia.
pub const ENCYCLOPEDIA_HOST: &str = "wikipedia";
/// Host token of the secondary book catalog.
pub const BOOKSHELF_HOST: &str = "goodreads";

const NO_ENTITY_REASON: &str = "Unable to resolve title->entity id";
const NO_CATALOG_PLOT_REASON: &str = "plot information unavailable in catalog";

#[async_trait]
pub trait MentionResolver: Send + Sync {
    /// Every result the mention's links produce, primary-catalog links first.
    /// Originator mentions and mentions without links yield nothing.
    async fn resolve(&self, mention: &RawMention) -> Result<Vec<ResolutionResult>>;
}

/// Turn anticipated failures into an unconfident result, pass the rest on.
fn recorded<T>(
    outcome: Result<T>,
    results: &mut Vec<ResolutionResult>,
    source: &Source,
) -> Result<Option<T>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recordable() => {
            debug!(error = %e, "linker: recording unconfident result");
            results.push(ResolutionResult::unconfident(None, source.clone(), e.to_string()));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// `Ok(None)` for anticipated failures, which only mean "no value here".
fn optional<T>(outcome: Result<T>) -> Result<Option<T>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recordable() => Ok(None),
        Err(e) => Err(e),
    }
}

fn entity_record(entity: &Entity) -> Result<serde_json::Value> {
    serde_json::to_value(entity).map_err(|e| ResolveError::corrupt(entity.id.clone(), e.to_string()))
}

async fn entities_for_title(
    kg: &KnowledgeGraphResolver,
    title: &str,
    results: &mut Vec<ResolutionResult>,
    source: &Source,
) -> Result<Vec<PageMatch>> {
    match kg.search_titles(title).await? {
        Some(matches) if !matches.is_empty() => Ok(matches),
        _ => {
            results.push(ResolutionResult::unconfident(None, source.clone(), NO_ENTITY_REASON));
            Ok(Vec::new())
        }
    }
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

pub struct MovieLinker {
    catalog: CatalogResolver,
    kg: KnowledgeGraphResolver,
    wikiplots: Option<WikiPlots>,
}

impl MovieLinker {
    pub fn new(catalog: CatalogResolver, kg: KnowledgeGraphResolver, wikiplots: Option<WikiPlots>) -> Self {
        Self {
            catalog,
            kg,
            wikiplots,
        }
    }

    /// Plot text for an encyclopedia title: local corpus, then the page's plot
    /// section, then the catalog synopsis.
    async fn plot_for(&self, title: &str, record: Option<&CatalogRecord>) -> Result<Option<String>> {
        if let Some(plot) = self.wikiplots.as_ref().and_then(|w| w.get(title)) {
            return Ok(Some(plot.to_string()));
        }
        if let Some(plot) = optional(self.kg.get_section_text(title, PLOT_SECTIONS).await)? {
            return Ok(Some(plot));
        }
        Ok(record.and_then(CatalogResolver::get_plot))
    }

    async fn resolve_catalog_id(
        &self,
        id: &CatalogId,
        url: &str,
        results: &mut Vec<ResolutionResult>,
    ) -> Result<()> {
        let source = Source::catalog(url);
        let record = self.catalog.get_record(id).await?;

        let hits = match self.kg.cross_verify(id, &record, &self.catalog).await {
            Ok(hits) => hits,
            Err(e) if e.is_recordable() => {
                results.push(catalog_only(id, &record, source, &e));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for hit in hits {
            let plot = self.plot_for(&hit.title, Some(&record)).await?;
            let candidate = MovieCandidate {
                catalog_id: id.clone(),
                kg_title: Some(hit.title),
                kg_url: Some(hit.url.clone()),
                plot,
                kg_record: Some(entity_record(&hit.entity)?),
            };
            results.push(ResolutionResult::confident(
                CandidateEntity::Movie(candidate),
                source.clone().with_kg_url(Some(hit.url)),
            ));
        }
        Ok(())
    }

    async fn resolve_page_title(
        &self,
        title: &str,
        url: &str,
        results: &mut Vec<ResolutionResult>,
    ) -> Result<()> {
        let source = Source::knowledge_graph(url);
        for page in entities_for_title(&self.kg, title, results, &source).await? {
            let Some(entity) = recorded(self.kg.get_entity(&page.entity_id).await, results, &source)? else {
                continue;
            };
            let Some(id) = recorded(
                self.kg.get_cross_reference_id(&entity, &self.catalog).await,
                results,
                &source,
            )?
            else {
                continue;
            };

            let record = self.catalog.get_record(&id).await?;
            let kg_url = self.kg.get_external_url(&entity.id, self.kg.language()).await?;
            let candidate = MovieCandidate {
                catalog_id: id.clone(),
                kg_title: Some(page.title.clone()),
                kg_url: kg_url.clone(),
                plot: self.plot_for(&page.title, Some(&record)).await?,
                kg_record: Some(entity_record(&entity)?),
            };
            let candidate = CandidateEntity::Movie(candidate);
            let source = source.clone().with_kg_url(kg_url);

            let result = match self.kg.cross_verify(&id, &record, &self.catalog).await {
                Ok(hits) if hits.iter().any(|h| h.entity.id == entity.id) => {
                    ResolutionResult::confident(candidate, source)
                }
                Ok(_) => ResolutionResult::unconfident(
                    Some(candidate),
                    source,
                    format!("Cross-verification of {id} did not return {}", entity.id),
                ),
                Err(e) if e.is_recordable() => {
                    ResolutionResult::unconfident(Some(candidate), source, e.to_string())
                }
                Err(e) => return Err(e),
            };
            results.push(result);
        }
        Ok(())
    }
}

/// A primary-catalog id no encyclopedia page verifies against: the catalog's
/// own title and synopsis when it has them.
fn catalog_only(
    id: &CatalogId,
    record: &CatalogRecord,
    source: Source,
    unverified: &ResolveError,
) -> ResolutionResult {
    if record.is_empty() {
        return ResolutionResult::unconfident(None, source, unverified.to_string());
    }
    match CatalogResolver::get_plot(record) {
        Some(plot) => {
            let candidate = MovieCandidate {
                catalog_id: id.clone(),
                kg_title: record.title().map(str::to_string),
                kg_url: None,
                plot: Some(plot),
                kg_record: None,
            };
            ResolutionResult::confident(CandidateEntity::Movie(candidate), source)
        }
        None => ResolutionResult::unconfident(None, source, NO_CATALOG_PLOT_REASON),
    }
}

#[async_trait]
impl MentionResolver for MovieLinker {
    async fn resolve(&self, mention: &RawMention) -> Result<Vec<ResolutionResult>> {
        let mut results = Vec::new();
        if mention.is_original_poster {
            return Ok(results);
        }
        let urls = links::find_urls(&mention.text);
        if urls.is_empty() {
            return Ok(results);
        }

        // First URL naming each id wins.
        let mut catalog_ids: BTreeMap<CatalogId, String> = BTreeMap::new();
        for url in links::classify(&urls, CATALOG_HOST) {
            for id in links::extract_catalog_ids(iter::once(&url)) {
                catalog_ids.entry(id).or_insert_with(|| url.clone());
            }
        }
        for (id, url) in &catalog_ids {
            self.resolve_catalog_id(id, url, &mut results).await?;
        }

        for url in links::classify(&urls, ENCYCLOPEDIA_HOST) {
            for title in links::extract_page_titles(iter::once(&url)) {
                self.resolve_page_title(&title, &url, &mut results).await?;
            }
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

pub struct BookLinker {
    scraper: BookshelfScraper,
    kg: KnowledgeGraphResolver,
    works: Option<WorkIndex>,
}

impl BookLinker {
    pub fn new(scraper: BookshelfScraper, kg: KnowledgeGraphResolver, works: Option<WorkIndex>) -> Self {
        Self { scraper, kg, works }
    }

    /// Fill work id and title from the work owning either ISBN.
    fn with_work(&self, mut book: BookCandidate) -> BookCandidate {
        let Some(index) = &self.works else {
            return book;
        };
        let work = index.work_for(
            book.isbn10.as_ref().map(|i| i.as_str()),
            book.isbn13.as_ref().map(|i| i.as_str()),
        );
        if let Some(work) = work {
            if book.work_id.is_none() {
                book.work_id = Some(work.work_id.clone());
            }
            if book.title.is_none() {
                book.title = work.title().map(str::to_string);
            }
        }
        book
    }

    async fn resolve_bookshelf_url(&self, url: &str, results: &mut Vec<ResolutionResult>) -> Result<()> {
        let source = Source::bookshelf(url);
        let Some(scraped) = recorded(self.scraper.scrape(url).await, results, &source)? else {
            return Ok(());
        };
        let book = self.with_work(BookCandidate {
            isbn10: Some(scraped.isbn10),
            isbn13: Some(scraped.isbn13),
            work_id: scraped.work_id,
            title: scraped.title,
            description: Some(scraped.description),
            url: Some(url.to_string()),
        });
        results.push(ResolutionResult::confident(CandidateEntity::Book(book), source));
        Ok(())
    }

    async fn resolve_page_title(
        &self,
        title: &str,
        url: &str,
        results: &mut Vec<ResolutionResult>,
    ) -> Result<()> {
        let source = Source::knowledge_graph(url);
        for page in entities_for_title(&self.kg, title, results, &source).await? {
            let Some(entity) = recorded(self.kg.get_entity(&page.entity_id).await, results, &source)? else {
                continue;
            };
            let Some((isbn10, isbn13)) =
                recorded(KnowledgeGraphResolver::get_standard_ids(&entity), results, &source)?
            else {
                continue;
            };

            let description = optional(self.kg.get_section_text(&page.title, PLOT_SECTIONS).await)?;
            let book = self.with_work(BookCandidate {
                isbn10: Some(isbn10),
                isbn13: Some(isbn13),
                work_id: None,
                title: None,
                description,
                url: Some(url.to_string()),
            });
            results.push(ResolutionResult::confident(CandidateEntity::Book(book), source.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl MentionResolver for BookLinker {
    async fn resolve(&self, mention: &RawMention) -> Result<Vec<ResolutionResult>> {
        let mut results = Vec::new();
        if mention.is_original_poster {
            return Ok(results);
        }
        let urls = links::find_urls(&mention.text);
        if urls.is_empty() {
            return Ok(results);
        }

        for url in links::classify(&urls, BOOKSHELF_HOST) {
            self.resolve_bookshelf_url(&url, &mut results).await?;
        }
        for url in links::classify(&urls, ENCYCLOPEDIA_HOST) {
            for title in links::extract_page_titles(iter::once(&url)) {
                self.resolve_page_title(&title, &url, &mut results).await?;
            }
        }
        Ok(results)
    }
}
